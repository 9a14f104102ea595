use uuid::Uuid;

/// Commands received over MQTT and fanned out to the scan loop.
#[derive(Clone, Debug)]
pub enum ScanCommand {
    Restart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeaconPresence {
    Present,
    Absent,
}

#[derive(Clone, Debug)]
pub struct PresenceAnnouncement {
    pub name: String,
    pub uuid: Uuid,
    pub presence: BeaconPresence,
}
