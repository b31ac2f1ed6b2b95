//! Shell-script stand-in for ffmpeg used by unit tests.
//!
//! The script looks only at its last argument. A path ending in
//! `.m3u8` gets a playlist plus segments in the same directory; anything
//! else gets a few bytes written to it (thumbnail mode).

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub(crate) enum FakeMode {
    /// Write this many non-empty segments.
    Segments(usize),
    /// Exit non-zero with a message on stderr.
    Fail,
    /// Write two segments, the second empty.
    EmptySegment,
    /// List two segments but only write the first.
    MissingSegment,
    /// Sleep far longer than any test timeout.
    Hang,
}

pub(crate) fn fake_ffmpeg(dir: &Path, mode: FakeMode) -> PathBuf {
    let body = match mode {
        FakeMode::Segments(n) => {
            let mut s = String::from(
                "out=$(dirname \"$last\")\n\
                 case \"$last\" in *.m3u8) ;; *) printf 'jpeg' > \"$last\"; exit 0;; esac\n\
                 printf '#EXTM3U\\n#EXT-X-VERSION:3\\n#EXT-X-TARGETDURATION:4\\n#EXT-X-MEDIA-SEQUENCE:0\\n' > \"$last\"\n",
            );
            for i in 0..n {
                s.push_str(&format!(
                    "printf 'segment' > \"$out/{i:03}.ts\"\n\
                     printf '#EXTINF:4.000000,\\n{i:03}.ts\\n' >> \"$last\"\n"
                ));
            }
            s.push_str("printf '#EXT-X-ENDLIST\\n' >> \"$last\"\n");
            s
        }
        FakeMode::Fail => "echo 'Invalid data found when processing input' >&2\nexit 1\n".into(),
        FakeMode::EmptySegment => "out=$(dirname \"$last\")\n\
             printf 'segment' > \"$out/000.ts\"\n\
             : > \"$out/001.ts\"\n\
             printf '#EXTM3U\\n#EXTINF:4.0,\\n000.ts\\n#EXTINF:4.0,\\n001.ts\\n#EXT-X-ENDLIST\\n' > \"$last\"\n"
            .into(),
        FakeMode::MissingSegment => "out=$(dirname \"$last\")\n\
             printf 'segment' > \"$out/000.ts\"\n\
             printf '#EXTM3U\\n#EXTINF:4.0,\\n000.ts\\n#EXTINF:4.0,\\n001.ts\\n#EXT-X-ENDLIST\\n' > \"$last\"\n"
            .into(),
        FakeMode::Hang => "exec sleep 30\n".into(),
    };

    let script = format!("#!/bin/sh\nfor last; do :; done\n{body}");
    let path = dir.join("ffmpeg");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
