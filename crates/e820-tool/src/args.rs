//! Command line arguments.
//!
//! Numbers are decimal or `0x`-prefixed hexadecimal, optionally followed by a
//! `K`, `M`, or `G` binary suffix.

use std::{fmt, path::PathBuf, str::FromStr};

use argh::FromArgs;
use e820::{MemoryKind, Resource, Strategy};

/// Build and inspect guest E820 memory maps.
#[derive(Debug, FromArgs)]
pub struct Args {
    /// log every table edit
    #[argh(switch, short = 'v')]
    pub verbose: bool,
    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
pub enum Command {
    Build(BuildArgs),
    Show(ShowArgs),
}

/// Build the map of a guest and optionally write the firmware blob.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "build")]
pub struct BuildArgs {
    /// bytes of memory starting at address 0
    #[argh(option, from_str_fn(parse_size))]
    pub lowmem: u64,
    /// bytes of memory starting at 4G (default: none)
    #[argh(option, default = "0", from_str_fn(parse_size))]
    pub highmem: u64,
    /// fixed window to reserve, as `BASE,LENGTH,TYPE`
    #[argh(option)]
    pub reserve: Vec<ReserveArg>,
    /// window to allocate, as `LENGTH,ALIGN,TYPE,STRATEGY[,ADDRESS]`
    #[argh(option)]
    pub alloc: Vec<AllocArg>,
    /// write the `etc/e820` blob to this file
    #[argh(option, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Decode and print a firmware blob.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "show")]
pub struct ShowArgs {
    /// path to the blob
    #[argh(positional)]
    pub path: PathBuf,
}

pub fn parse_size(s: &str) -> Result<u64, String> {
    let (digits, shift) = match s.as_bytes().last() {
        Some(b'K' | b'k') => (&s[..s.len() - 1], 10),
        Some(b'M' | b'm') => (&s[..s.len() - 1], 20),
        Some(b'G' | b'g') => (&s[..s.len() - 1], 30),
        _ => (s, 0),
    };
    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        digits.parse()
    }
    .map_err(|e| format!("invalid number `{s}`: {e}"))?;
    value
        .checked_mul(1 << shift)
        .ok_or_else(|| format!("number too large: `{s}`"))
}

fn parse_kind(s: &str) -> Result<MemoryKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "ram" | "usable" => Ok(MemoryKind::Usable),
        "reserved" => Ok(MemoryKind::Reserved),
        "acpi" => Ok(MemoryKind::Acpi),
        "nvs" => Ok(MemoryKind::Nvs),
        _ => Err(format!("unknown memory type `{s}`")),
    }
}

fn parse_strategy(name: &str, address: Option<&str>) -> Result<Strategy, String> {
    let required_address = || -> Result<u64, String> {
        parse_size(address.ok_or_else(|| format!("strategy `{name}` needs an address"))?)
    };
    match name.to_ascii_lowercase().as_str() {
        "any" => match address {
            None => Ok(Strategy::Any),
            Some(_) => Err("strategy `any` takes no address".to_owned()),
        },
        "lowest" => Ok(Strategy::Lowest(required_address()?)),
        "highest" => Ok(Strategy::Highest(required_address()?)),
        "specific" => Ok(Strategy::Specific(required_address()?)),
        _ => Err(format!("unknown strategy `{name}`")),
    }
}

/// A `--reserve` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveArg(pub Resource);

impl FromStr for ReserveArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s.split(',').collect();
        let [base, length, kind] = fields.as_slice() else {
            return Err(format!("expected `BASE,LENGTH,TYPE`: `{s}`"));
        };
        Ok(Self(Resource::new(
            parse_size(base)?,
            parse_size(length)?,
            parse_kind(kind)?,
        )))
    }
}

/// An `--alloc` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocArg {
    pub length: u64,
    pub alignment: u64,
    pub kind: MemoryKind,
    pub strategy: Strategy,
}

impl FromStr for AllocArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s.split(',').collect();
        let (length, alignment, kind, strategy, address) = match fields.as_slice() {
            [length, alignment, kind, strategy] => (length, alignment, kind, strategy, None),
            [length, alignment, kind, strategy, address] => {
                (length, alignment, kind, strategy, Some(*address))
            }
            _ => return Err(format!("expected `LENGTH,ALIGN,TYPE,STRATEGY[,ADDRESS]`: `{s}`")),
        };
        Ok(Self {
            length: parse_size(length)?,
            alignment: parse_size(alignment)?,
            kind: parse_kind(kind)?,
            strategy: parse_strategy(strategy, address)?,
        })
    }
}

impl fmt::Display for AllocArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} window of {:#x} bytes (alignment={:#x}, strategy={:?})",
            self.kind, self.length, self.alignment, self.strategy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("0x1000"), Ok(0x1000));
        assert_eq!(parse_size("0XfeD4"), Ok(0xfed4));
        assert_eq!(parse_size("512M"), Ok(512 << 20));
        assert_eq!(parse_size("4G"), Ok(4 << 30));
        assert_eq!(parse_size("0x10k"), Ok(0x4000));
        parse_size("").unwrap_err();
        parse_size("M").unwrap_err();
        parse_size("12x").unwrap_err();
        parse_size("0xffffffffffffffffG").unwrap_err();
    }

    #[test]
    fn test_parse_reserve() {
        assert_eq!(
            "0xfed40000,0x5000,reserved".parse::<ReserveArg>(),
            Ok(ReserveArg(Resource::new(
                0xfed4_0000,
                0x5000,
                MemoryKind::Reserved
            )))
        );
        "0x1000,0x1000".parse::<ReserveArg>().unwrap_err();
        "0x1000,0x1000,rom".parse::<ReserveArg>().unwrap_err();
    }

    #[test]
    fn test_parse_alloc() {
        assert_eq!(
            "4K,4K,ACPI,any".parse::<AllocArg>(),
            Ok(AllocArg {
                length: 0x1000,
                alignment: 0x1000,
                kind: MemoryKind::Acpi,
                strategy: Strategy::Any,
            })
        );
        assert_eq!(
            "0x2000,1M,nvs,highest,4G".parse::<AllocArg>().map(|a| a.strategy),
            Ok(Strategy::Highest(4 << 30))
        );
        "4K,4K,acpi,lowest".parse::<AllocArg>().unwrap_err();
        "4K,4K,acpi,any,0x1000".parse::<AllocArg>().unwrap_err();
        "4K,4K,acpi,first".parse::<AllocArg>().unwrap_err();
    }

    #[test]
    fn test_parse_command_line() {
        let args = Args::from_args(
            &["e820"],
            &[
                "-v",
                "build",
                "--lowmem",
                "512M",
                "--reserve",
                "0xfec00000,4K,reserved",
                "--alloc",
                "4K,4K,acpi,any",
                "--alloc",
                "1M,1M,reserved,highest,4G",
            ],
        )
        .unwrap();
        assert!(args.verbose);
        let build = match args.command {
            Command::Build(build) => build,
            Command::Show(show) => panic!("unexpected command: {show:?}"),
        };
        assert_eq!(build.lowmem, 512 << 20);
        assert_eq!(build.highmem, 0);
        assert_eq!(build.reserve.len(), 1);
        assert_eq!(build.alloc.len(), 2);
        assert_eq!(build.output, None);
    }
}
