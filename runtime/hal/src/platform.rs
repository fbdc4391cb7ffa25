//! Platform detection
//!
//! Resolves a static description of the board we are running on. Detection
//! runs a list of [`BoardProbe`]s in order; the first probe that recognises a
//! board wins. If nothing matches, the designated unknown descriptor is
//! returned instead of an error, so the kernel can keep booting with a
//! reduced driver set.
//!
//! Probe order for [`PlatformDetector::default`]:
//! 1. Compile-time board features (`board-*`)
//! 2. `EDGEOS_BOARD` environment variable
//! 3. Device tree `compatible` string

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use bitflags::bitflags;

use crate::error::PlatformError;

/// Environment variable consulted by [`EnvProbe`]
pub const BOARD_ENV_VAR: &str = "EDGEOS_BOARD";

/// Default device tree `compatible` node on Linux hosts
pub const DEVICE_TREE_COMPATIBLE: &str = "/proc/device-tree/compatible";

bitflags! {
    /// Hardware features offered by a board
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PlatformFeatures: u32 {
        const UART     = 1 << 0;
        const I2C      = 1 << 1;
        const SPI      = 1 << 2;
        const CAN      = 1 << 3;
        const MODBUS   = 1 << 4;
        const ETHERCAT = 1 << 5;
        const ADC      = 1 << 6;
        const DAC      = 1 << 7;
        const MOTION   = 1 << 8;
        const IMU      = 1 << 9;
    }
}

/// Known boards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BoardId {
    /// QEMU `virt` machine, ARM64
    QemuVirtAarch64,
    /// QEMU `virt` machine, RISC-V 64
    QemuVirtRiscv64,
    /// x86_64 PC
    Pc99,
    /// Raspberry Pi 4 Model B
    #[cfg_attr(feature = "serde", serde(rename = "rpi4"))]
    RaspberryPi4,
    /// Host simulation board: every feature backed by simulated drivers
    #[cfg_attr(feature = "serde", serde(rename = "sim"))]
    Simulator,
    /// Nothing recognised
    Unknown,
}

impl BoardId {
    /// Every recognisable board (excludes `Unknown`)
    pub const KNOWN: [BoardId; 5] = [
        BoardId::QemuVirtAarch64,
        BoardId::QemuVirtRiscv64,
        BoardId::Pc99,
        BoardId::RaspberryPi4,
        BoardId::Simulator,
    ];

    /// Stable board name
    pub const fn name(self) -> &'static str {
        match self {
            BoardId::QemuVirtAarch64 => "qemu-virt-aarch64",
            BoardId::QemuVirtRiscv64 => "qemu-virt-riscv64",
            BoardId::Pc99 => "pc99",
            BoardId::RaspberryPi4 => "rpi4",
            BoardId::Simulator => "sim",
            BoardId::Unknown => "unknown",
        }
    }

    /// Features wired up on this board
    pub fn features(self) -> PlatformFeatures {
        match self {
            BoardId::QemuVirtAarch64 | BoardId::QemuVirtRiscv64 => PlatformFeatures::UART,
            BoardId::Pc99 => PlatformFeatures::UART,
            BoardId::RaspberryPi4 => {
                PlatformFeatures::UART | PlatformFeatures::I2C | PlatformFeatures::SPI
            }
            BoardId::Simulator => PlatformFeatures::all(),
            BoardId::Unknown => PlatformFeatures::empty(),
        }
    }

    /// Device tree `compatible` strings that identify this board
    fn compatible(self) -> &'static [&'static str] {
        match self {
            BoardId::QemuVirtAarch64 => &["linux,dummy-virt"],
            BoardId::QemuVirtRiscv64 => &["riscv-virtio"],
            BoardId::RaspberryPi4 => &["raspberrypi,4-model-b", "brcm,bcm2711"],
            BoardId::Pc99 | BoardId::Simulator | BoardId::Unknown => &[],
        }
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoardId {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BoardId::KNOWN
            .iter()
            .copied()
            .find(|board| board.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlatformError::UnknownBoard(s.into()))
    }
}

/// Immutable snapshot of the platform, produced once at boot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformDescriptor {
    /// Target architecture (e.g. `aarch64`, `x86_64`)
    pub arch: &'static str,

    /// Board identity
    pub board: BoardId,

    /// Features available on this board
    pub features: PlatformFeatures,
}

impl PlatformDescriptor {
    /// Descriptor for a known board on the current architecture
    pub fn for_board(board: BoardId) -> Self {
        Self {
            arch: std::env::consts::ARCH,
            board,
            features: board.features(),
        }
    }

    /// The designated unknown descriptor
    pub fn unknown() -> Self {
        Self::for_board(BoardId::Unknown)
    }

    /// Whether detection failed to identify the board
    pub fn is_unknown(&self) -> bool {
        self.board == BoardId::Unknown
    }

    /// Reject the unknown descriptor with a typed error
    pub fn require_known(&self) -> Result<&Self, PlatformError> {
        if self.is_unknown() {
            Err(PlatformError::UnknownPlatform)
        } else {
            Ok(self)
        }
    }

    /// Whether every feature in `required` is present
    pub fn supports(&self, required: PlatformFeatures) -> bool {
        self.features.contains(required)
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.board, self.arch)
    }
}

/// A single source of board identity
pub trait BoardProbe: Send + Sync {
    /// Probe name for logging
    fn name(&self) -> &'static str;

    /// Identify the board, or `None` if this source has no answer
    fn probe(&self) -> Option<BoardId>;
}

/// Board selected by cargo feature at compile time
pub struct CompileTimeProbe;

impl BoardProbe for CompileTimeProbe {
    fn name(&self) -> &'static str {
        "compile-time"
    }

    fn probe(&self) -> Option<BoardId> {
        if cfg!(feature = "board-qemu-virt-aarch64") {
            Some(BoardId::QemuVirtAarch64)
        } else if cfg!(feature = "board-qemu-virt-riscv64") {
            Some(BoardId::QemuVirtRiscv64)
        } else if cfg!(feature = "board-pc99") {
            Some(BoardId::Pc99)
        } else if cfg!(feature = "board-rpi4") {
            Some(BoardId::RaspberryPi4)
        } else if cfg!(feature = "board-sim") {
            Some(BoardId::Simulator)
        } else {
            None
        }
    }
}

/// Board named by an environment variable
pub struct EnvProbe {
    var: &'static str,
}

impl EnvProbe {
    /// Probe reading `var`
    pub const fn new(var: &'static str) -> Self {
        Self { var }
    }
}

impl Default for EnvProbe {
    fn default() -> Self {
        Self::new(BOARD_ENV_VAR)
    }
}

impl BoardProbe for EnvProbe {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn probe(&self) -> Option<BoardId> {
        let value = std::env::var(self.var).ok()?;
        match value.parse() {
            Ok(board) => Some(board),
            Err(err) => {
                log::warn!("Ignoring {}: {}", self.var, err);
                None
            }
        }
    }
}

/// Board identified from the device tree `compatible` property
pub struct DeviceTreeProbe {
    path: PathBuf,
}

impl DeviceTreeProbe {
    /// Probe reading the `compatible` property at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Match a raw `compatible` property (NUL-separated strings)
    pub fn match_compatible(raw: &[u8]) -> Option<BoardId> {
        raw.split(|&b| b == 0)
            .filter_map(|entry| core::str::from_utf8(entry).ok())
            .filter(|entry| !entry.is_empty())
            .find_map(|entry| {
                BoardId::KNOWN
                    .iter()
                    .copied()
                    .find(|board| board.compatible().iter().any(|c| *c == entry))
            })
    }
}

impl Default for DeviceTreeProbe {
    fn default() -> Self {
        Self::new(DEVICE_TREE_COMPATIBLE)
    }
}

impl BoardProbe for DeviceTreeProbe {
    fn name(&self) -> &'static str {
        "device-tree"
    }

    fn probe(&self) -> Option<BoardId> {
        let raw = std::fs::read(&self.path).ok()?;
        Self::match_compatible(&raw)
    }
}

/// Ordered list of probes
pub struct PlatformDetector {
    probes: Vec<Box<dyn BoardProbe>>,
}

impl PlatformDetector {
    /// Detector with no probes (always yields the unknown descriptor)
    pub fn empty() -> Self {
        Self { probes: Vec::new() }
    }

    /// Append a probe
    pub fn with_probe(mut self, probe: impl BoardProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    /// Run probes in order and build the descriptor
    pub fn detect(&self) -> PlatformDescriptor {
        for probe in &self.probes {
            if let Some(board) = probe.probe() {
                log::info!("Platform detected by {} probe: {}", probe.name(), board);
                return PlatformDescriptor::for_board(board);
            }
        }

        log::warn!("No probe recognised the board, using unknown platform");
        PlatformDescriptor::unknown()
    }
}

impl Default for PlatformDetector {
    fn default() -> Self {
        Self::empty()
            .with_probe(CompileTimeProbe)
            .with_probe(EnvProbe::default())
            .with_probe(DeviceTreeProbe::default())
    }
}

static DETECTED: spin::Once<PlatformDescriptor> = spin::Once::new();

/// Detect the current platform
///
/// Runs the default detector on first use and caches the result, so every
/// call within one process returns the same descriptor.
pub fn detect() -> PlatformDescriptor {
    DETECTED
        .call_once(|| PlatformDetector::default().detect())
        .clone()
}
