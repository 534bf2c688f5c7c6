// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use crate::fin::{FinRegions, MeshSummary};
use crate::geometry::{BoundingBox, Entity, FragmentResult};
use colored::*;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    fn rule() {
        println!("{}", "━".repeat(80).bright_black());
    }

    fn format_entities(entities: &[Entity]) -> String {
        let items: Vec<String> = entities.iter().map(|e| format!("({}, {})", e.dim.index(), e.tag)).collect();
        format!("[{}]", items.join(", "))
    }

    /// Report the shapes handed to the fragmenter
    pub fn report_inputs(inputs: &[Entity]) {
        println!("\n{} {}", "Input shapes:".bold(), Self::format_entities(inputs).cyan());
    }

    /// Report fragment output entities and the parent to child relations
    pub fn report_fragments(result: &FragmentResult) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Fragmented:".bold(), format!("{} surfaces", result.entities.len()).cyan());
        Self::rule();
        println!("  {} {}", "Entities:".bright_black(), Self::format_entities(&result.entities));
        for (parent, children) in &result.relations {
            println!(
                "  {} {} {}",
                format!("{parent}").bright_black(),
                "→".bright_black(),
                Self::format_entities(children)
            );
        }
        Self::rule();
    }

    /// Report the root curve query and its result
    pub fn report_root_query(search: &BoundingBox, found: &[Entity]) {
        println!(
            "{} [{:.3}, {:.3}] x [{:.3}, {:.3}] {} {}",
            "Root query:".bold(),
            search.min.x,
            search.max.x,
            search.min.y,
            search.max.y,
            "→".bright_black(),
            Self::format_entities(found).cyan()
        );
    }

    /// Report every physical group
    pub fn report_groups(regions: &FinRegions) {
        println!("\n{}", "Physical groups:".bold());
        for group in regions.groups() {
            println!(
                "  {:>3} {:<12} {} {}",
                group.tag.to_string().cyan(),
                group.name,
                format!("{}", group.dim).bright_black(),
                format!("{:?}", group.members).bright_black()
            );
        }
    }

    /// Report a written mesh
    pub fn report_mesh(summary: &MeshSummary, duration: Duration) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Meshed:".bold(), summary.path.display().to_string().cyan());
        Self::rule();
        println!("  {} {}", "Nodes:".bright_black(), summary.nodes.to_string().cyan());
        println!("  {} {}", "Lines:".bright_black(), summary.lines.to_string().cyan());
        println!("  {} {}", "Triangles:".bright_black(), summary.triangles.to_string().cyan());
        println!(
            "  {} lc {} | min {} | dist {}..{}",
            "Sizes:".bright_black(),
            summary.sizes.lc,
            summary.sizes.size_min,
            summary.sizes.dist_min,
            summary.sizes.dist_max
        );
        println!("  {} {}", "Time:".bright_black(), Self::format_duration(duration).yellow());
        Self::rule();
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }
}
