use std::collections::HashMap;

use log::debug;

use crate::advertisement;
use crate::beacon::BeaconIdentity;

/// How an advertised identity is compared against the tracked one. The
/// default only looks at the UUID, so one target covers every major/minor a
/// venue hands out under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    UuidOnly,
    FullIdentity,
}

/// What one scan cycle produced: whether the tracked beacon showed up, and
/// how many iBeacon payloads were decoded at all (useful when debugging a
/// quiet room).
#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    pub target_seen: bool,
    pub beacons_decoded: usize,
}

/// Accumulates manufacturer-data advertisements over one scan cycle and
/// reduces them to a seen/not-seen observation for the tracked beacon.
pub struct Scanner {
    target: BeaconIdentity,
    company_ids: Vec<u16>,
    policy: MatchPolicy,
    target_seen: bool,
    beacons_decoded: usize,
}

impl Scanner {
    pub fn new(target: BeaconIdentity, company_ids: Vec<u16>, policy: MatchPolicy) -> Self {
        Scanner {
            target,
            company_ids,
            policy,
            target_seen: false,
            beacons_decoded: 0,
        }
    }

    pub fn target(&self) -> &BeaconIdentity {
        &self.target
    }

    /// Feed the manufacturer-data map of one received advertisement.
    /// Entries under foreign company ids and payloads that are not iBeacon
    /// frames are skipped.
    pub fn record(&mut self, manufacturer_data: &HashMap<u16, Vec<u8>>) {
        for (company_id, payload) in manufacturer_data {
            if !self.company_ids.contains(company_id) {
                continue;
            }
            let decoded = match advertisement::decode(payload) {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(
                        "Skipping non-beacon payload under company id {:#06x}: {}",
                        company_id, err
                    );
                    continue;
                }
            };
            self.beacons_decoded += 1;
            debug!(
                "Decoded beacon {} (calibrated power {} dBm)",
                decoded.identity, decoded.calibrated_power
            );
            if self.matches(&decoded.identity) {
                self.target_seen = true;
            }
        }
    }

    fn matches(&self, identity: &BeaconIdentity) -> bool {
        match self.policy {
            MatchPolicy::UuidOnly => identity.uuid == self.target.uuid,
            MatchPolicy::FullIdentity => *identity == self.target,
        }
    }

    /// Close out the current cycle and start the next one.
    pub fn finish_cycle(&mut self) -> CycleSummary {
        let summary = CycleSummary {
            target_seen: self.target_seen,
            beacons_decoded: self.beacons_decoded,
        };
        self.target_seen = false;
        self.beacons_decoded = 0;
        summary
    }
}
