//! The closed catalog of kernel event kinds.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Every notification the kernel can fire.
///
/// The numeric value of a kind is its position in this list and is stable
/// for a given release; new kinds are only ever appended.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u32)]
pub enum EventKind {
    KernelStarted,
    PreLogin,
    PostLogin,
    LoginError,
    ShellInitialized,
    PreExecuteCommand,
    PostExecuteCommand,
    KernelError,
    ContKernelError,
    PreShutdown,
    PostShutdown,
    PreReboot,
    PostReboot,
    PreShowScreensaver,
    PostShowScreensaver,
    PreUnlock,
    PostUnlock,
    CommandError,
    PreReloadConfig,
    PostReloadConfig,
    GarbageCollected,
    FTPShellInitialized,
    FTPPreExecuteCommand,
    FTPPostExecuteCommand,
    FTPCommandError,
    FTPPreUpload,
    FTPPostUpload,
    FTPPreDownload,
    FTPPostDownload,
    FTPConnected,
    FTPDisconnected,
    IMAPShellInitialized,
    SFTPConnected,
    SFTPDisconnected,
    SFTPPreDownload,
    SFTPPostDownload,
    SSHConnected,
    SSHDisconnected,
    SSHPreExecuteCommand,
    SSHPostExecuteCommand,
    SSHCommandError,
    SSHError,
    ThemeSet,
    ThemeSetError,
    ColorSet,
    ColorSetError,
    ConfigSaved,
    ConfigSaveError,
    ConfigRead,
    ConfigReadError,
    ThreadStarted,
    ThreadStopped,
    ThreadFatal,
}

impl EventKind {
    /// The label recorded in the fired-event history.
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Stable numeric value of this kind.
    pub fn number(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_name_round_trip() {
        assert_eq!(EventKind::PostLogin.label(), "PostLogin");
        assert_eq!(EventKind::from_str("FTPPreDownload").unwrap(), EventKind::FTPPreDownload);
        assert!(EventKind::from_str("NotAnEvent").is_err());
    }

    #[test]
    fn test_numbers_follow_declaration_order() {
        for (index, kind) in EventKind::iter().enumerate() {
            assert_eq!(kind.number() as usize, index);
            assert_eq!(EventKind::from_repr(kind.number()), Some(kind));
        }
        assert_eq!(EventKind::from_repr(EventKind::COUNT as u32), None);
    }
}
