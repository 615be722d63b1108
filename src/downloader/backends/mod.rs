// Backend implementations

mod ytdlp;

pub use ytdlp::YtDlpBackend;
