//! Line-oriented text format describing bus traffic for a [`Trace`].
//!
//! ```text
//! baud 19200          # optional, first statement only
//! idle 4              # both lines recessive for 4 bit times
//! break               # 13 bit break and delimiter, or `break 20`
//! master 55 3c        # bytes sent by the master node, hex
//! slave 01 02 fc      # bytes sent by the slave node
//! glitch slave        # quarter-bit dominant spike
//! badstop master 12   # byte with a dominant stop bit
//! ```

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::{all_consuming, map, map_res, opt, value};
use nom::multi::separated_list1;
use nom::sequence::{delimited, pair, preceded, separated_pair};
use nom::IResult;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

use super::{Trace, DEFAULT_BREAK_BITS};
use crate::config::{self, Baud, DEFAULT_BAUD};
use crate::hal::Channel;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("line {}: cannot parse {:?}", line, text))]
    Syntax { line: usize, text: String },
    #[snafu(display("line {}: {}", line, source))]
    InvalidBaud { line: usize, source: config::Error },
    #[snafu(display("line {}: baud must come before any traffic", line))]
    LateBaud { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Baud(u32),
    Idle(u64),
    Break(u64),
    Bytes(Channel, Vec<u8>),
    Glitch(Channel),
    BadStop(Channel, u8),
}

/// A parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    baud: Baud,
    statements: Vec<Statement>,
}

impl Script {
    /// Parse `text`. Blank lines and `#` comments are skipped.
    /// # Errors
    /// The first line that does not parse, or a bad or misplaced `baud`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut script = Self {
            baud: DEFAULT_BAUD,
            statements: Vec::new(),
        };
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let code = raw.split('#').next().unwrap_or_default().trim();
            if code.is_empty() {
                continue;
            }
            let (_, statement) = parse_line(code)
                .ok()
                .context(SyntaxSnafu { line, text: code })?;
            if let Statement::Baud(requested) = statement {
                ensure!(script.statements.is_empty(), LateBaudSnafu { line });
                script.baud = Baud::new(requested).context(InvalidBaudSnafu { line })?;
                continue;
            }
            script.statements.push(statement);
        }
        log::debug!(
            "parsed {} statements at {} baud",
            script.statements.len(),
            *script.baud
        );
        Ok(script)
    }

    pub fn baud(&self) -> Baud {
        self.baud
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Lay the statements out on a fresh trace.
    pub fn trace(&self) -> Trace {
        let mut trace = Trace::new(self.baud);
        for statement in &self.statements {
            match statement {
                Statement::Baud(_) => {}
                Statement::Idle(bits) => {
                    trace.idle(*bits);
                }
                Statement::Break(bits) => {
                    trace.brk(*bits);
                }
                Statement::Bytes(channel, bytes) => {
                    trace.bytes(*channel, bytes);
                }
                Statement::Glitch(channel) => {
                    trace.glitch(*channel);
                }
                Statement::BadStop(channel, byte) => {
                    trace.bad_stop(*channel, *byte);
                }
            }
        }
        trace
    }
}

impl FromStr for Script {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_line(input: &str) -> IResult<&str, Statement> {
    all_consuming(delimited(space0, statement, space0))(input)
}

fn statement(input: &str) -> IResult<&str, Statement> {
    alt((
        map(preceded(pair(tag("baud"), space1), number), Statement::Baud),
        map(preceded(pair(tag("idle"), space1), number), Statement::Idle),
        map(
            preceded(tag("break"), opt(preceded(space1, number))),
            |bits| Statement::Break(bits.unwrap_or(DEFAULT_BREAK_BITS)),
        ),
        map(preceded(pair(tag("glitch"), space1), channel), Statement::Glitch),
        map(
            preceded(
                pair(tag("badstop"), space1),
                separated_pair(channel, space1, hex_byte),
            ),
            |(channel, byte)| Statement::BadStop(channel, byte),
        ),
        map(
            separated_pair(channel, space1, separated_list1(space1, hex_byte)),
            |(channel, bytes)| Statement::Bytes(channel, bytes),
        ),
    ))(input)
}

fn channel(input: &str) -> IResult<&str, Channel> {
    alt((
        value(Channel::Master, tag("master")),
        value(Channel::Slave, tag("slave")),
    ))(input)
}

fn number<T: FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, |digits: &str| digits.parse::<T>())(input)
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(1, 2, |c: char| c.is_ascii_hexdigit()),
        |digits| u8::from_str_radix(digits, 16),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::baud;

    #[test]
    fn test_parse_statements() {
        let script = Script::parse(
            "# header only\n\
             baud 19200\n\
             \n\
             idle 4\n\
             break\n\
             break 20  # long one\n\
             master 55 3c\n\
             slave 1 02 FC\n\
             glitch slave\n\
             badstop master 12\n",
        )
        .unwrap();
        assert_eq!(script.baud(), baud(19200));
        assert_eq!(
            script.statements(),
            &[
                Statement::Idle(4),
                Statement::Break(DEFAULT_BREAK_BITS),
                Statement::Break(20),
                Statement::Bytes(Channel::Master, vec![0x55, 0x3c]),
                Statement::Bytes(Channel::Slave, vec![0x01, 0x02, 0xfc]),
                Statement::Glitch(Channel::Slave),
                Statement::BadStop(Channel::Master, 0x12),
            ]
        );
    }

    #[test]
    fn test_default_baud() {
        let script: Script = "idle 1".parse().unwrap();
        assert_eq!(script.baud(), DEFAULT_BAUD);
    }

    #[test]
    fn test_errors_carry_line() {
        assert_eq!(
            Script::parse("idle 1\nmaster 123\n"),
            Err(Error::Syntax {
                line: 2,
                text: "master 123".into()
            })
        );
        assert_eq!(
            Script::parse("idle 1\nbaud 9600"),
            Err(Error::LateBaud { line: 2 })
        );
        assert_eq!(
            Script::parse("baud 300"),
            Err(Error::InvalidBaud {
                line: 1,
                source: config::Error::BaudOutOfRange { baud: 300 }
            })
        );
        assert!(Script::parse("slave").is_err());
        assert!(Script::parse("breakdown").is_err());
        assert!(Script::parse("glitch both").is_err());
    }

    #[test]
    fn test_trace_layout() {
        let script = Script::parse("baud 10000\nidle 2\nbreak\nmaster 55 3c\nslave 7").unwrap();
        let trace = script.trace();
        let marks: Vec<(Channel, u8, u64)> = trace
            .byte_marks()
            .iter()
            .map(|m| (m.channel, m.value, m.bit))
            .collect();
        let header = 2 + DEFAULT_BREAK_BITS + 1;
        assert_eq!(
            marks,
            vec![
                (Channel::Master, 0x55, header),
                (Channel::Master, 0x3c, header + 10),
                (Channel::Slave, 0x07, header + 20),
            ]
        );
        assert_eq!(trace.end(), trace.bit_time(header + 30));
    }
}
