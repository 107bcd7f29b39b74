// ABOUTME: Opt-in diagnostic channel that dumps raw SMPP frames through tracing
// ABOUTME: Kept apart from the framing code so production builds can leave it disabled

use std::fmt::{self, Write};

/// Target used for raw frame dumps, so subscribers can filter them on their own
pub const TRACE_TARGET: &str = "smpp_session::wire";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("<-"),
            Direction::Outbound => f.write_str("->"),
        }
    }
}

/// Emit a hex dump of one frame at TRACE level on [`TRACE_TARGET`]
pub fn trace_frame(direction: Direction, frame: &[u8]) {
    if tracing::enabled!(target: TRACE_TARGET, tracing::Level::TRACE) {
        tracing::trace!(
            target: TRACE_TARGET,
            %direction,
            len = frame.len(),
            "\n{}",
            hex_dump(frame)
        );
    }
}

/// Canonical hex+ASCII dump: offset, two groups of eight octets, printable text
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(16) * 79);

    for (line, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", line * 16);

        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{b:02x} ");
                }
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }

        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }

    out
}
