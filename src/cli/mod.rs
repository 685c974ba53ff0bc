use crate::infra::FeedSource;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DEMO_PACE: Duration = Duration::from_millis(400);

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Watch { source: FeedSource },
    Demo { pace: Duration },
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1);
    let Some(first) = iter.next() else {
        return Ok(CliInvocation::Watch {
            source: FeedSource::Stdin,
        });
    };

    match first.as_str() {
        "demo" => {
            let mut pace = DEFAULT_DEMO_PACE;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--pace" => {
                        let value = iter
                            .next()
                            .ok_or_else(|| CliParseError::MissingFlagValue("--pace".to_string()))?;
                        pace = parse_millis("--pace", value)?;
                    }
                    other if other.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(other.to_string()));
                    }
                    other => return Err(CliParseError::UnexpectedArgument(other.to_string())),
                }
            }
            Ok(CliInvocation::Demo { pace })
        }
        "-" => {
            reject_trailing(iter)?;
            Ok(CliInvocation::Watch {
                source: FeedSource::Stdin,
            })
        }
        other if other.starts_with('-') => Err(CliParseError::UnknownFlag(other.to_string())),
        path => {
            reject_trailing(iter)?;
            Ok(CliInvocation::Watch {
                source: FeedSource::File(PathBuf::from(path)),
            })
        }
    }
}

fn reject_trailing<'a>(mut rest: impl Iterator<Item = &'a String>) -> Result<(), CliParseError> {
    match rest.next() {
        Some(extra) => Err(CliParseError::UnexpectedArgument(extra.clone())),
        None => Ok(()),
    }
}

fn parse_millis(flag: &str, value: &str) -> Result<Duration, CliParseError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}
