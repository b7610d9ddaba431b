use clap::Parser;

use crate::{
    domain::{filter::SortBy, filter::TimeWindow, item::ContentKind},
    utils::version,
};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    #[arg(short, long, value_name = "INT", help = "Items per page [default: config]")]
    pub page_size: Option<usize>,

    #[arg(short, long, value_name = "INT", help = "Items held by the demo store")]
    pub items: Option<usize>,

    #[arg(
        long,
        value_name = "INT",
        default_value_t = 3,
        help = "Pages to walk through"
    )]
    pub pages: usize,

    #[arg(short, long, value_name = "KIND", help = "Only show post, track or playlist")]
    pub kind: Option<ContentKind>,

    #[arg(short, long, value_name = "ORDER", help = "newest, oldest, most-liked, most-played")]
    pub sort: Option<SortBy>,

    #[arg(short, long, value_name = "WINDOW", help = "day, week, month, year")]
    pub window: Option<TimeWindow>,

    #[arg(short, long, value_name = "TEXT", help = "Search query")]
    pub query: Option<String>,

    #[arg(long, value_name = "MS", help = "Simulated fetch latency")]
    pub latency_ms: Option<u64>,

    #[arg(long, value_name = "INT", help = "Fail every nth fetch")]
    pub fail_every: Option<usize>,
}
