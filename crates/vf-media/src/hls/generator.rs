//! HLS playlist generation functions.

use super::types::{MasterPlaylist, MediaPlaylist};
use std::fmt::Write;

/// Generate an HLS master playlist (M3U8) from a [`MasterPlaylist`].
///
/// Output includes `#EXTM3U`, `#EXT-X-VERSION`, `#EXT-X-INDEPENDENT-SEGMENTS`
/// and an `#EXT-X-STREAM-INF` for each variant, in the given order.
pub fn generate_master_playlist(playlist: &MasterPlaylist) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTM3U").unwrap();
    writeln!(out, "#EXT-X-VERSION:3").unwrap();
    writeln!(out, "#EXT-X-INDEPENDENT-SEGMENTS").unwrap();

    for variant in &playlist.variants {
        write!(out, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth).unwrap();

        if let Some((w, h)) = variant.resolution {
            write!(out, ",RESOLUTION={}x{}", w, h).unwrap();
        }

        if !variant.codecs.is_empty() {
            write!(out, ",CODECS=\"{}\"", variant.codecs).unwrap();
        }

        if let Some(ref name) = variant.name {
            write!(out, ",NAME=\"{}\"", name).unwrap();
        }

        writeln!(out).unwrap();
        writeln!(out, "{}", variant.uri).unwrap();
    }

    out
}

/// Generate an HLS media playlist (M3U8) from a [`MediaPlaylist`].
///
/// Output includes:
/// - `#EXTM3U` header
/// - `#EXT-X-TARGETDURATION`
/// - `#EXT-X-MEDIA-SEQUENCE`
/// - `#EXT-X-PLAYLIST-TYPE:VOD` for ended playlists
/// - `#EXTINF` for each segment
/// - `#EXT-X-ENDLIST` for ended playlists
pub fn generate_media_playlist(playlist: &MediaPlaylist) -> String {
    let mut out = String::new();

    writeln!(out, "#EXTM3U").unwrap();
    writeln!(out, "#EXT-X-VERSION:3").unwrap();
    writeln!(out, "#EXT-X-TARGETDURATION:{}", playlist.target_duration).unwrap();
    writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", playlist.media_sequence).unwrap();

    if playlist.ended {
        writeln!(out, "#EXT-X-PLAYLIST-TYPE:VOD").unwrap();
    }

    for segment in &playlist.segments {
        writeln!(out, "#EXTINF:{:.6},", segment.duration).unwrap();
        writeln!(out, "{}", segment.uri).unwrap();
    }

    if playlist.ended {
        writeln!(out, "#EXT-X-ENDLIST").unwrap();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::types::{Segment, Variant};

    #[test]
    fn test_generate_master_playlist_basic() {
        let playlist = MasterPlaylist {
            variants: vec![
                Variant {
                    bandwidth: 5128000,
                    resolution: Some((1920, 1080)),
                    codecs: "avc1.640028,mp4a.40.2".to_string(),
                    name: Some("1080p".to_string()),
                    uri: "1080p/index.m3u8".to_string(),
                },
                Variant {
                    bandwidth: 2628000,
                    resolution: Some((1280, 720)),
                    codecs: String::new(),
                    name: None,
                    uri: "720p/index.m3u8".to_string(),
                },
            ],
        };

        let m3u8 = generate_master_playlist(&playlist);

        assert!(m3u8.starts_with("#EXTM3U\n"));
        assert!(m3u8.contains("BANDWIDTH=5128000,RESOLUTION=1920x1080"));
        assert!(m3u8.contains("CODECS=\"avc1.640028,mp4a.40.2\",NAME=\"1080p\""));
        assert!(m3u8.contains("#EXT-X-STREAM-INF:BANDWIDTH=2628000,RESOLUTION=1280x720\n720p/index.m3u8\n"));
        let hi = m3u8.find("1080p/index.m3u8").unwrap();
        let lo = m3u8.find("720p/index.m3u8").unwrap();
        assert!(hi < lo);
    }

    #[test]
    fn test_generate_master_playlist_empty() {
        let m3u8 = generate_master_playlist(&MasterPlaylist { variants: vec![] });
        assert_eq!(m3u8, "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-INDEPENDENT-SEGMENTS\n");
    }

    #[test]
    fn test_media_playlist_format_exact() {
        let playlist = MediaPlaylist::vod(vec![
            Segment {
                duration: 10.0,
                uri: "000.ts".to_string(),
            },
            Segment {
                duration: 4.2,
                uri: "001.ts".to_string(),
            },
        ]);

        let expected = "\
#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:10
#EXT-X-MEDIA-SEQUENCE:0
#EXT-X-PLAYLIST-TYPE:VOD
#EXTINF:10.000000,
000.ts
#EXTINF:4.200000,
001.ts
#EXT-X-ENDLIST
";
        assert_eq!(generate_media_playlist(&playlist), expected);
    }

    #[test]
    fn test_media_playlist_not_ended() {
        let playlist = MediaPlaylist {
            target_duration: 4,
            media_sequence: 100,
            segments: vec![Segment {
                duration: 4.0,
                uri: "100.ts".to_string(),
            }],
            ended: false,
        };

        let m3u8 = generate_media_playlist(&playlist);
        assert!(m3u8.contains("#EXT-X-MEDIA-SEQUENCE:100"));
        assert!(!m3u8.contains("PLAYLIST-TYPE"));
        assert!(!m3u8.contains("#EXT-X-ENDLIST"));
    }

    #[test]
    fn test_vod_target_duration_rounds_up() {
        let playlist = MediaPlaylist::vod(vec![Segment {
            duration: 10.01,
            uri: "000.ts".into(),
        }]);
        assert_eq!(playlist.target_duration, 11);
        assert!((playlist.total_duration() - 10.01).abs() < 1e-9);
    }
}
