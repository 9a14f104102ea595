use std::time::Duration;

use anyhow::Result;
use btleplug::api::{Central as _, CentralEvent, ScanFilter};
use futures::StreamExt as _;
use log::{debug, error, info};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::messages::{BeaconPresence, PresenceAnnouncement, ScanCommand};
use crate::presence::{PresenceEvent, PresenceTracker};
use crate::scanner::Scanner;

pub struct Manager {
    adapter: btleplug::platform::Adapter,
    mqtt_client: crate::mqtt::MqttClient,
    mqtt_event_loop: rumqttc::EventLoop,
    scanner: Scanner,
    tracker: PresenceTracker,
    beacon_name: String,
    scan_cycle: Duration,
}

impl Manager {
    pub fn new(
        adapter: btleplug::platform::Adapter,
        mqtt_client: crate::mqtt::MqttClient,
        mqtt_event_loop: rumqttc::EventLoop,
        scanner: Scanner,
        tracker: PresenceTracker,
        beacon_name: String,
        scan_cycle: Duration,
    ) -> Self {
        Manager {
            adapter,
            mqtt_client,
            mqtt_event_loop,
            scanner,
            tracker,
            beacon_name,
            scan_cycle,
        }
    }

    /// Scan until the adapter's event stream closes. Advertisements are
    /// buffered by the scanner; a timer closes out one scan cycle per tick
    /// and feeds the result to the presence tracker, whose transitions are
    /// announced over MQTT.
    pub async fn run_loop(self) -> Result<()> {
        let Manager {
            adapter,
            mqtt_client,
            mqtt_event_loop: mut eventloop,
            mut scanner,
            mut tracker,
            beacon_name,
            scan_cycle,
        } = self;

        adapter.start_scan(ScanFilter::default()).await?;
        info!(
            "Scanning for beacon {} ({}), cycle length {:?}",
            beacon_name,
            scanner.target(),
            scan_cycle
        );

        let (tx, mut rx) = broadcast::channel(10);

        // Handle incoming MQTT messages (e.g. scan restart requests)
        let command_client = mqtt_client.clone();
        tokio::task::spawn(async move {
            command_client.event_loop(&mut eventloop, tx).await;
        });

        let mut events = adapter.events().await?;
        let mut ticker = tokio::time::interval_at(Instant::now() + scan_cycle, scan_cycle);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Ok(command) = rx.recv() => {
                    match command {
                        ScanCommand::Restart => {
                            info!("Received scan restart request");
                            adapter.start_scan(ScanFilter::default()).await?;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let cycle = scanner.finish_cycle();
                    let event = tracker.observe(cycle.target_seen);
                    debug!(
                        "Scan cycle complete: {} beacon payload(s), target seen: {}, present: {}",
                        cycle.beacons_decoded,
                        cycle.target_seen,
                        tracker.is_present()
                    );
                    if let Some(event) = event {
                        let presence = match event {
                            PresenceEvent::BecamePresent => {
                                info!("Beacon {} became visible", beacon_name);
                                BeaconPresence::Present
                            }
                            PresenceEvent::BecameAbsent => {
                                info!(
                                    "Beacon {} lost after {} missed cycles",
                                    beacon_name,
                                    tracker.consecutive_misses()
                                );
                                BeaconPresence::Absent
                            }
                        };
                        let announcement = PresenceAnnouncement {
                            name: beacon_name.clone(),
                            uuid: scanner.target().uuid,
                            presence,
                        };
                        if let Err(err) = mqtt_client.announce_presence(&announcement).await {
                            error!("Error announcing presence change: {:?}", err);
                        }
                    }
                }
                event = events.next() => {
                    match event {
                        Some(CentralEvent::ManufacturerDataAdvertisement { manufacturer_data, .. }) => {
                            scanner.record(&manufacturer_data);
                        }
                        Some(_) => {}
                        None => {
                            info!("Adapter event stream closed");
                            break;
                        }
                    }
                }
            }
        }

        mqtt_client.disconnect().await?;

        Ok(())
    }
}
