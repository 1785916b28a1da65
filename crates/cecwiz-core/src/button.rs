//! Remote control buttons accepted by `--user-control-pressed`

use serde::{Deserialize, Serialize};
use std::str::FromStr;

macro_rules! buttons {
    ($($variant:ident => ($id:literal, $code:literal)),+ $(,)?) => {
        /// A user control (remote button) with its cec-ctl `ui-cmd` identifier
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Button {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl Button {
            /// Every button, in UI command code order
            pub const ALL: &'static [Button] = &[$(Button::$variant),+];

            const TABLE: &'static [(Button, &'static str, u8)] = &[$((Button::$variant, $id, $code)),+];

            /// Identifier passed as `ui-cmd=<id>`
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Button::$variant => $id,)+
                }
            }

            /// UI command code
            pub fn code(&self) -> u8 {
                match self {
                    $(Button::$variant => $code,)+
                }
            }
        }
    };
}

buttons! {
    Select => ("select", 0x00),
    Up => ("up", 0x01),
    Down => ("down", 0x02),
    Left => ("left", 0x03),
    Right => ("right", 0x04),
    RightUp => ("right-up", 0x05),
    RightDown => ("right-down", 0x06),
    LeftUp => ("left-up", 0x07),
    LeftDown => ("left-down", 0x08),
    DeviceRootMenu => ("device-root-menu", 0x09),
    DeviceSetupMenu => ("device-setup-menu", 0x0a),
    ContentsMenu => ("contents-menu", 0x0b),
    FavoriteMenu => ("favorite-menu", 0x0c),
    Back => ("back", 0x0d),
    MediaTopMenu => ("media-top-menu", 0x10),
    MediaContextSensitiveMenu => ("media-context-sensitive-menu", 0x11),
    NumberEntryMode => ("number-entry-mode", 0x1d),
    Number11 => ("number-11", 0x1e),
    Number12 => ("number-12", 0x1f),
    Number0OrNumber10 => ("number-0-or-number-10", 0x20),
    Number1 => ("number-1", 0x21),
    Number2 => ("number-2", 0x22),
    Number3 => ("number-3", 0x23),
    Number4 => ("number-4", 0x24),
    Number5 => ("number-5", 0x25),
    Number6 => ("number-6", 0x26),
    Number7 => ("number-7", 0x27),
    Number8 => ("number-8", 0x28),
    Number9 => ("number-9", 0x29),
    Dot => ("dot", 0x2a),
    Enter => ("enter", 0x2b),
    Clear => ("clear", 0x2c),
    NextFavorite => ("next-favorite", 0x2f),
    ChannelUp => ("channel-up", 0x30),
    ChannelDown => ("channel-down", 0x31),
    PreviousChannel => ("previous-channel", 0x32),
    SoundSelect => ("sound-select", 0x33),
    InputSelect => ("input-select", 0x34),
    DisplayInformation => ("display-information", 0x35),
    Help => ("help", 0x36),
    PageUp => ("page-up", 0x37),
    PageDown => ("page-down", 0x38),
    Power => ("power", 0x40),
    VolumeUp => ("volume-up", 0x41),
    VolumeDown => ("volume-down", 0x42),
    Mute => ("mute", 0x43),
    Play => ("play", 0x44),
    Stop => ("stop", 0x45),
    Pause => ("pause", 0x46),
    Record => ("record", 0x47),
    Rewind => ("rewind", 0x48),
    FastForward => ("fast-forward", 0x49),
    Eject => ("eject", 0x4a),
    SkipForward => ("skip-forward", 0x4b),
    SkipBackward => ("skip-backward", 0x4c),
    StopRecord => ("stop-record", 0x4d),
    PauseRecord => ("pause-record", 0x4e),
    Angle => ("angle", 0x50),
    SubPicture => ("sub-picture", 0x51),
    VideoOnDemand => ("video-on-demand", 0x52),
    ElectronicProgramGuide => ("electronic-program-guide", 0x53),
    TimerProgramming => ("timer-programming", 0x54),
    InitialConfiguration => ("initial-configuration", 0x55),
    SelectBroadcastType => ("select-broadcast-type", 0x56),
    SelectSoundPresentation => ("select-sound-presentation", 0x57),
    AudioDescription => ("audio-description", 0x58),
    Internet => ("internet", 0x59),
    Mode3d => ("3d-mode", 0x5a),
    PlayFunction => ("play-function", 0x60),
    PausePlayFunction => ("pause-play-function", 0x61),
    RecordFunction => ("record-function", 0x62),
    PauseRecordFunction => ("pause-record-function", 0x63),
    StopFunction => ("stop-function", 0x64),
    MuteFunction => ("mute-function", 0x65),
    RestoreVolumeFunction => ("restore-volume-function", 0x66),
    TuneFunction => ("tune-function", 0x67),
    SelectMediaFunction => ("select-media-function", 0x68),
    SelectAvInputFunction => ("select-av-input-function", 0x69),
    SelectAudioInputFunction => ("select-audio-input-function", 0x6a),
    PowerToggleFunction => ("power-toggle-function", 0x6b),
    PowerOffFunction => ("power-off-function", 0x6c),
    PowerOnFunction => ("power-on-function", 0x6d),
    F1Blue => ("f1-blue", 0x71),
    F2Red => ("f2-red", 0x72),
    F3Green => ("f3-green", 0x73),
    F4Yellow => ("f4-yellow", 0x74),
    F5 => ("f5", 0x75),
    Data => ("data", 0x76),
}

impl Button {
    pub fn from_code(code: u8) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(button, _, _)| *button)
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a button identifier is not in the table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown button: {0}")]
pub struct UnknownButton(pub String);

impl FromStr for Button {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Self::TABLE
            .iter()
            .find(|(_, name, _)| *name == id)
            .map(|(button, _, _)| *button)
            .ok_or_else(|| UnknownButton(s.to_string()))
    }
}
