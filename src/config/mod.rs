pub mod settings;

pub use settings::{
    BYTES_PER_GB, BandwidthConfig, BandwidthLimit, Config, DingtalkConfig, DiskConfig,
    EmailConfig, NotifyConfig, WecomConfig, gb_to_bytes, parse_bandwidth,
};
