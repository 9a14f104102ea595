use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use log::{debug, info};

use crate::advertisement::PAYLOAD_LEN;

/// Owns the BlueZ advertising facility for one beacon. The registration
/// handle lives inside, so dropping the broadcaster always withdraws the
/// advertisement, whichever way the caller exits.
pub struct Broadcaster {
    adapter: bluer::Adapter,
    handle: Option<AdvertisementHandle>,
}

impl Broadcaster {
    pub async fn new() -> Result<Self> {
        let session = bluer::Session::new().await?;
        let adapter_names = session.adapter_names().await?;
        let adapter_name = adapter_names
            .first()
            .context("no Bluetooth adapter present")?;
        let adapter = session.adapter(adapter_name)?;
        adapter.set_powered(true).await?;
        info!(
            "Advertising via Bluetooth adapter {} with address {}",
            adapter_name,
            adapter.address().await?
        );
        Ok(Broadcaster {
            adapter,
            handle: None,
        })
    }

    /// Register a non-connectable broadcast carrying `payload` under the
    /// given company id. Calling this again replaces the active
    /// advertisement.
    pub async fn start(
        &mut self,
        manufacturer_code: u16,
        payload: [u8; PAYLOAD_LEN],
        local_name: Option<String>,
    ) -> Result<()> {
        let advertisement = Advertisement {
            advertisement_type: Type::Broadcast,
            manufacturer_data: BTreeMap::from([(manufacturer_code, payload.to_vec())]),
            local_name,
            ..Default::default()
        };
        debug!("Registering advertisement {:?}", advertisement);
        self.handle = Some(self.adapter.advertise(advertisement).await?);
        Ok(())
    }

    /// Withdraw the advertisement, if one is active. Dropping the handle is
    /// what unregisters it with BlueZ.
    pub fn stop(&mut self) {
        if self.handle.take().is_some() {
            info!("Removing advertisement");
        }
    }
}
