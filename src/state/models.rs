// Data models for device state
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical device row from the `Devices` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub device_name: String,
    pub room_name: String,
    pub background_color: String,
    pub is_device_on: bool,
}

impl Device {
    /// Display label for the power state
    pub fn status(&self) -> &'static str {
        if self.is_device_on {
            "ON"
        } else {
            "OFF"
        }
    }
}

/// Mirror row stored in a room's own table.
///
/// `id` is local to the room table and unrelated to [`Device::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDevice {
    pub id: i64,
    pub device_name: String,
    pub background_color: String,
    pub is_device_on: bool,
}

impl RoomDevice {
    pub fn status(&self) -> &'static str {
        if self.is_device_on {
            "ON"
        } else {
            "OFF"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceAction {
    #[serde(rename = "Added")]
    Added,
    #[serde(rename = "Deleted")]
    Deleted,
    #[serde(rename = "Turned On")]
    TurnedOn,
    #[serde(rename = "Turned Off")]
    TurnedOff,
}

impl DeviceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAction::Added => "Added",
            DeviceAction::Deleted => "Deleted",
            DeviceAction::TurnedOn => "Turned On",
            DeviceAction::TurnedOff => "Turned Off",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "Added" => Some(DeviceAction::Added),
            "Deleted" => Some(DeviceAction::Deleted),
            "Turned On" => Some(DeviceAction::TurnedOn),
            "Turned Off" => Some(DeviceAction::TurnedOff),
            _ => None,
        }
    }

    /// Log action for a device that has just been switched to `is_on`
    pub fn for_power_state(is_on: bool) -> Self {
        if is_on {
            DeviceAction::TurnedOn
        } else {
            DeviceAction::TurnedOff
        }
    }
}

/// Entry from the append-only `DeviceLogs` table.
///
/// `device_id` may refer to a device that has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLog {
    pub id: i64,
    pub device_id: i64,
    pub action: DeviceAction,
    pub timestamp: DateTime<Utc>,
}

/// A room paired with the live contents of its mirror table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_name: String,
    pub devices: Vec<RoomDevice>,
}

/// Read-only projection handed to the presentation layer after each operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub devices: Vec<Device>,
    /// Most recent first
    pub logs: Vec<DeviceLog>,
    pub rooms: Vec<Room>,
}

impl Snapshot {
    pub fn device(&self, id: i64) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn room(&self, room_name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.room_name == room_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    pub device_name: String,
    pub room_name: String,
    pub background_color: String,
}

impl CreateDeviceRequest {
    pub fn is_complete(&self) -> bool {
        !self.device_name.is_empty() && !self.room_name.is_empty() && !self.background_color.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDeviceRequest {
    pub device_name: String,
    pub room_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_text_matches_stored_value() {
        for action in [
            DeviceAction::Added,
            DeviceAction::Deleted,
            DeviceAction::TurnedOn,
            DeviceAction::TurnedOff,
        ] {
            assert_eq!(DeviceAction::from_string(action.as_str()), Some(action));
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
        assert_eq!(DeviceAction::from_string("Exploded"), None);
    }

    #[test]
    fn test_status_label() {
        let mut device = Device {
            id: 1,
            device_name: "Lamp".to_string(),
            room_name: "Kitchen".to_string(),
            background_color: "Red".to_string(),
            is_device_on: false,
        };
        assert_eq!(device.status(), "OFF");
        device.is_device_on = true;
        assert_eq!(device.status(), "ON");
    }

    #[test]
    fn test_create_request_requires_all_fields() {
        let request = CreateDeviceRequest {
            device_name: "Lamp".to_string(),
            room_name: "Kitchen".to_string(),
            background_color: "Red".to_string(),
        };
        assert!(request.is_complete());

        let missing_color = CreateDeviceRequest {
            background_color: String::new(),
            ..request.clone()
        };
        assert!(!missing_color.is_complete());

        let missing_room = CreateDeviceRequest {
            room_name: String::new(),
            ..request
        };
        assert!(!missing_room.is_complete());
    }
}
