use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Next,
    Previous,
    Select(usize),
    Rotate { dx: f32, dy: f32 },
    Zoom(f32),
    /// Single-pointer drag by the given pixels.
    Drag { dx: f32, dy: f32 },
    /// Two-pointer pinch that widens the pointer gap by the given pixels.
    Pinch(f32),
    Wait(f32),
    /// Ticks until navigation is allowed again.
    Settle,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Next => write!(f, "next"),
            Command::Previous => write!(f, "prev"),
            Command::Select(step) => write!(f, "select {step}"),
            Command::Rotate { dx, dy } => write!(f, "rotate {dx} {dy}"),
            Command::Zoom(delta) => write!(f, "zoom {delta}"),
            Command::Drag { dx, dy } => write!(f, "drag {dx} {dy}"),
            Command::Pinch(delta) => write!(f, "pinch {delta}"),
            Command::Wait(seconds) => write!(f, "wait {seconds}"),
            Command::Settle => write!(f, "settle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{word}`")]
    UnknownCommand { line: usize, word: String },
    #[error("line {line}: `{command}` expects {expected} argument(s), got {found}")]
    ArgumentCount {
        line: usize,
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: `{value}` is not a valid number")]
    InvalidNumber { line: usize, value: String },
}

/// Parses commands separated by newlines or `;`. Text after `#` is ignored.
pub fn parse_script(source: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let code = line.split('#').next().unwrap_or_default();
        for statement in code.split(';') {
            let words: Vec<&str> = statement.split_whitespace().collect();
            let Some((&name, args)) = words.split_first() else {
                continue;
            };
            commands.push(parse_command(line_no, name, args)?);
        }
    }
    Ok(commands)
}

fn parse_command(line: usize, name: &str, args: &[&str]) -> Result<Command, ScriptError> {
    let expect = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(ScriptError::ArgumentCount {
                line,
                command: name.to_string(),
                expected,
                found: args.len(),
            })
        }
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "next" => {
            expect(0)?;
            Command::Next
        }
        "prev" | "previous" => {
            expect(0)?;
            Command::Previous
        }
        "select" | "goto" => {
            expect(1)?;
            Command::Select(number(line, args[0])?)
        }
        "rotate" => {
            expect(2)?;
            Command::Rotate {
                dx: finite(line, args[0])?,
                dy: finite(line, args[1])?,
            }
        }
        "zoom" => {
            expect(1)?;
            Command::Zoom(finite(line, args[0])?)
        }
        "drag" => {
            expect(2)?;
            Command::Drag {
                dx: finite(line, args[0])?,
                dy: finite(line, args[1])?,
            }
        }
        "pinch" => {
            expect(1)?;
            Command::Pinch(finite(line, args[0])?)
        }
        "wait" => {
            expect(1)?;
            Command::Wait(finite(line, args[0])?)
        }
        "settle" => {
            expect(0)?;
            Command::Settle
        }
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                word: name.to_string(),
            });
        }
    };
    Ok(command)
}

fn number<T: std::str::FromStr>(line: usize, value: &str) -> Result<T, ScriptError> {
    value.parse().map_err(|_| ScriptError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

/// Like `number`, but `inf` and `NaN` are refused.
fn finite(line: usize, value: &str) -> Result<f32, ScriptError> {
    let parsed: f32 = number(line, value)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ScriptError::InvalidNumber {
            line,
            value: value.to_string(),
        })
    }
}
