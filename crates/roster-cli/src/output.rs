//! Formatted output helpers for CLI commands.
//!
//! Provides table rendering for container summaries and human-readable
//! byte and port formatting.

use std::fmt::Write as _;

use roster_common::types::strip_separator;
use roster_view::list::{ContainerSummary, PortSummary};

/// Length of an identifier in truncated output.
const SHORT_ID_LEN: usize = 12;

/// Formats a byte count into a human-readable string (e.g., "128.0 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Shortens an identifier to its first twelve characters.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Renders ports as `0.0.0.0:8080->80/tcp, 443/tcp`.
#[must_use]
pub fn format_ports(ports: &[PortSummary]) -> String {
    ports
        .iter()
        .map(|p| match p.public_port {
            Some(public) if p.ip.is_empty() => {
                format!("{public}->{}/{}", p.private_port, p.protocol)
            }
            Some(public) => format!("{}:{public}->{}/{}", p.ip, p.private_port, p.protocol),
            None => format!("{}/{}", p.private_port, p.protocol),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Options controlling the `ps` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Print full identifiers.
    pub no_trunc: bool,
    /// Append a size column.
    pub size: bool,
    /// Print identifiers only.
    pub quiet: bool,
}

/// Renders container summaries as a table.
#[must_use]
pub fn render_table(containers: &[ContainerSummary], opts: TableOptions) -> String {
    let mut out = String::new();
    let id = |s: &ContainerSummary| {
        if opts.no_trunc {
            s.id.clone()
        } else {
            short_id(&s.id).to_owned()
        }
    };

    if opts.quiet {
        for c in containers {
            let _ = writeln!(out, "{}", id(c));
        }
        return out;
    }

    let _ = write!(
        out,
        "{:<14} {:<20} {:<24} {:<22} {:<30} {:<20}",
        "CONTAINER ID", "IMAGE", "COMMAND", "STATUS", "PORTS", "NAMES"
    );
    if opts.size {
        let _ = write!(out, " SIZE");
    }
    out.push('\n');

    for c in containers {
        let names: Vec<_> = c
            .names
            .iter()
            .map(|n| strip_separator(n))
            .collect();
        let _ = write!(
            out,
            "{:<14} {:<20} {:<24} {:<22} {:<30} {:<20}",
            id(c),
            c.image,
            format!("\"{}\"", c.command),
            c.status,
            format_ports(&c.ports),
            names.join(",")
        );
        if opts.size {
            let rw = c.size_rw.map_or_else(|| "-".to_owned(), format_bytes);
            let root = c.size_root_fs.map_or_else(|| "-".to_owned(), format_bytes);
            let _ = write!(out, " {rw} (virtual {root})");
        }
        out.push('\n');
    }
    out
}
