use std::path::{Path, PathBuf};

use pipeduplex_transport::{create_fifo, DEFAULT_FIFO_MODE};

use crate::sink::MessageSink;
use crate::source::MessageSource;

pub(crate) fn make_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/pdx-{}-{}-{}",
        tag,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

pub(crate) fn make_fifo(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    create_fifo(&path, DEFAULT_FIFO_MODE).expect("fifo should be creatable");
    path
}

/// Open both ends of `path`, the sink on a helper thread.
pub(crate) fn open_pair(path: &Path) -> (MessageSource, MessageSink) {
    let sink_path = path.to_path_buf();
    let sink = std::thread::spawn(move || MessageSink::open(sink_path).expect("sink should open"));
    let source = MessageSource::open(path).expect("source should open");
    (source, sink.join().expect("sink thread should finish"))
}
