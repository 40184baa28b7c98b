// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{Context, Result};
use cairn::{ChartPipeline, ChartType};
use clap::{Arg, Command};
use serde_json::{json, Value};
use tracing::{info, Level};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let matches = Command::new("cairn-chart-demo")
        .version("1.0.0")
        .about("Profiles a JSON dataset and prints a chart recommendation with its option document")
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("FILE")
                .help("Path to a JSON file (array of records, or object with an array property)")
                .required(false),
        )
        .arg(
            Arg::new("chart-type")
                .short('t')
                .long("chart-type")
                .value_name("TYPE")
                .help("Force a chart type instead of taking the recommendation")
                .required(false),
        )
        .arg(
            Arg::new("top")
                .long("top")
                .value_name("NUMBER")
                .help("Number of ranked chart types to print")
                .default_value("3"),
        )
        .arg(
            Arg::new("shape-only")
                .long("shape-only")
                .action(clap::ArgAction::SetTrue)
                .help("Print the structural option document without binding row data"),
        )
        .arg(
            Arg::new("compact")
                .long("compact")
                .action(clap::ArgAction::SetTrue)
                .help("Print the option document on a single line"),
        )
        .get_matches();

    let data = match matches.get_one::<String>("data") {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read '{path}'"))?;
            serde_json::from_str(&raw).with_context(|| format!("'{path}' is not valid JSON"))?
        }
        None => sample_data(),
    };
    let requested = match matches.get_one::<String>("chart-type") {
        Some(name) => Some(
            ChartType::parse(name)
                .with_context(|| format!("unknown chart type '{name}'"))?,
        ),
        None => None,
    };
    let top: usize = matches
        .get_one::<String>("top")
        .unwrap()
        .parse()
        .unwrap_or(3);

    let pipeline = ChartPipeline::new();
    print!("{}", pipeline.report(&data));

    for (chart_type, score) in pipeline.recommend_top(&data, top) {
        info!(chart_type = chart_type.as_str(), score, "candidate");
    }

    let config = pipeline.synthesise_config(&data, requested);
    info!(chart_type = config.chart_type.as_str(), title = %config.title, "synthesised");

    let document = if matches.get_flag("shape-only") {
        pipeline.render_option(&config)
    } else {
        pipeline.transcode(&config, &data)
    };
    let rendered = if matches.get_flag("compact") {
        serde_json::to_string(&document)?
    } else {
        serde_json::to_string_pretty(&document)?
    };
    println!("{rendered}");
    Ok(())
}

fn sample_data() -> Value {
    json!([
        {"month": "2024-01-01", "revenue": 1200.0, "cost": 760.0},
        {"month": "2024-02-01", "revenue": 1410.0, "cost": 804.0},
        {"month": "2024-03-01", "revenue": 1730.0, "cost": 915.0},
        {"month": "2024-04-01", "revenue": 1655.0, "cost": 890.0},
        {"month": "2024-05-01", "revenue": 1980.0, "cost": 1002.0},
        {"month": "2024-06-01", "revenue": 2240.0, "cost": 1086.0}
    ])
}
