//! Edit scripts: one sheet command per line.

use anyhow::{Context, Result, anyhow, bail};
use std::io::Write;
use std::str::FromStr;
use tabula_core::{Position, Sheet};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(Position, String),
    Clear(Position),
    Get(Position),
    Text(Position),
    Refs(Position),
    Size,
    Values,
    Texts,
}

fn parse_position(name: &str) -> Result<Position> {
    Position::from_a1(name).ok_or_else(|| anyhow!("Invalid cell reference: {}", name))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        let command = match keyword {
            "set" => {
                // The text is everything after the reference, verbatim.
                let (name, text) = rest.split_once(' ').unwrap_or((rest, ""));
                Command::Set(parse_position(name)?, text.to_string())
            }
            "clear" => Command::Clear(parse_position(rest.trim())?),
            "get" => Command::Get(parse_position(rest.trim())?),
            "text" => Command::Text(parse_position(rest.trim())?),
            "refs" => Command::Refs(parse_position(rest.trim())?),
            "size" => Command::Size,
            "values" => Command::Values,
            "texts" => Command::Texts,
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    line.parse().map(Some)
}

pub fn execute<W: Write>(sheet: &mut Sheet, command: &Command, out: &mut W) -> Result<()> {
    match command {
        Command::Set(pos, text) => sheet
            .set_cell(*pos, text)
            .with_context(|| format!("set {}", pos))?,
        Command::Clear(pos) => sheet
            .clear_cell(*pos)
            .with_context(|| format!("clear {}", pos))?,
        Command::Get(pos) => writeln!(out, "{}", sheet.value(*pos)?)?,
        Command::Text(pos) => writeln!(out, "{}", sheet.text(*pos)?)?,
        Command::Refs(pos) => {
            let refs: Vec<String> = sheet
                .get_cell(*pos)?
                .map(|cell| cell.referenced_cells())
                .unwrap_or_default()
                .iter()
                .map(Position::to_string)
                .collect();
            writeln!(out, "{}", refs.join(" "))?;
        }
        Command::Size => {
            let size = sheet.printable_size();
            writeln!(out, "{}x{}", size.rows, size.cols)?;
        }
        Command::Values => sheet.print_values(out)?,
        Command::Texts => sheet.print_texts(out)?,
    }
    Ok(())
}
