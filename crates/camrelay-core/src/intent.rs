//! Assistant intent translation
//!
//! Maps an inbound voice-assistant intent (name plus slot values) onto the
//! command payload sent to a backend device and the sentence spoken back to
//! the user. Translation is a pure function of its inputs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Spoken when the skill is opened without an intent
pub const WELCOME_SPEECH: &str =
    "Welcome to camera control. You can say show camera one, show cameras one and two, or show all cameras.";

/// Spoken for the help intent
pub const HELP_SPEECH: &str =
    "You can say show camera followed by a number, show cameras one and two, hide camera three, or show all cameras. What would you like to do?";

/// Spoken for cancel and stop
pub const GOODBYE_SPEECH: &str = "Goodbye!";

/// Spoken when the backend could not be reached
pub const APOLOGY_SPEECH: &str =
    "Sorry, I couldn't reach the camera system. Please try again.";

/// Spoken when the assistant envelope could not be understood
pub const FALLBACK_SPEECH: &str = "Sorry, I didn't understand that request.";

/// Slot names the translator knows about
pub const SLOT_CAMERA_NUMBER: &str = "cameraNumber";
pub const SLOT_FIRST_CAMERA: &str = "firstCamera";
pub const SLOT_SECOND_CAMERA: &str = "secondCamera";
pub const SLOT_ALL_CAMERAS: &str = "allCameras";

/// The closed set of recognized intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    OpenCamera,
    CloseCamera,
    ShowAllCameras,
    Help,
    /// Cancel or stop
    Stop,
    /// Anything else, carrying the original name
    Unhandled(String),
}

impl Intent {
    /// Map a wire intent name onto the closed set
    pub fn from_name(name: &str) -> Self {
        match name {
            "OpenCameraIntent" | "open-camera" => Intent::OpenCamera,
            "CloseCameraIntent" | "close-camera" => Intent::CloseCamera,
            "ShowAllCamerasIntent" | "show-all-cameras" => Intent::ShowAllCameras,
            "AMAZON.HelpIntent" | "help" => Intent::Help,
            "AMAZON.CancelIntent" | "AMAZON.StopIntent" | "cancel" | "stop" => Intent::Stop,
            other => Intent::Unhandled(other.to_string()),
        }
    }

    /// Whether the intent results in a command for the backend
    pub fn is_camera_intent(&self) -> bool {
        matches!(
            self,
            Intent::OpenCamera | Intent::CloseCamera | Intent::ShowAllCameras
        )
    }
}

/// The populated subset of the known camera slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSlots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_cameras: Option<String>,
}

impl CameraSlots {
    /// Pick the known slots out of a sparse slot map.
    ///
    /// Unknown names and empty values are dropped.
    pub fn from_map(slots: &HashMap<String, String>) -> Self {
        let pick = |name: &str| {
            slots
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            camera_number: pick(SLOT_CAMERA_NUMBER),
            first_camera: pick(SLOT_FIRST_CAMERA),
            second_camera: pick(SLOT_SECOND_CAMERA),
            all_cameras: pick(SLOT_ALL_CAMERAS),
        }
    }

    fn is_empty(&self) -> bool {
        self.camera_number.is_none()
            && self.first_camera.is_none()
            && self.second_camera.is_none()
            && self.all_cameras.is_none()
    }
}

/// Normalized command payload sent to a backend device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Intent name as received
    pub intent: String,
    pub slots: CameraSlots,
}

/// Result of translating one intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub command: Command,
    /// Sentence spoken back to the user; may be empty
    pub speech: String,
    /// Whether `command` should be sent to a backend
    pub forwardable: bool,
    /// Whether the assistant session should end after this response
    pub end_session: bool,
}

/// Translate an intent into a backend command and a spoken confirmation
pub fn translate(intent_name: &str, slots: &HashMap<String, String>) -> Translation {
    let intent = Intent::from_name(intent_name);
    let camera_slots = if intent.is_camera_intent() {
        CameraSlots::from_map(slots)
    } else {
        CameraSlots::default()
    };

    let (speech, end_session) = match &intent {
        Intent::OpenCamera => (camera_speech("Displaying", &camera_slots), false),
        Intent::CloseCamera => (camera_speech("Hiding", &camera_slots), false),
        Intent::ShowAllCameras => ("Displaying all cameras.".to_string(), false),
        Intent::Help => (HELP_SPEECH.to_string(), false),
        Intent::Stop => (GOODBYE_SPEECH.to_string(), true),
        Intent::Unhandled(_) => (String::new(), false),
    };

    Translation {
        command: Command {
            intent: intent_name.to_string(),
            slots: camera_slots,
        },
        speech,
        forwardable: intent.is_camera_intent(),
        end_session,
    }
}

fn camera_speech(verb: &str, slots: &CameraSlots) -> String {
    if let Some(n) = &slots.camera_number {
        return format!("{} camera {}.", verb, n);
    }
    if let (Some(a), Some(b)) = (&slots.first_camera, &slots.second_camera) {
        return format!("{} cameras {} and {}.", verb, a, b);
    }
    format!("{} all cameras.", verb)
}
