// Known-host matching for page URLs
//
// Matching is a bidirectional, case-insensitive substring test against the
// host list. It deliberately over-matches (`m.youtube.com` vs `youtube.com`);
// the price is the odd false positive for short hosts such as `tv`.

/// Hosts yt-dlp is known to resolve
pub const KNOWN_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "www.youtube.com",
    "m.youtube.com",
    "twitch.tv",
    "www.twitch.tv",
    "clips.twitch.tv",
    "vimeo.com",
    "www.vimeo.com",
    "player.vimeo.com",
    "dailymotion.com",
    "www.dailymotion.com",
    "facebook.com",
    "www.facebook.com",
    "fb.watch",
    "m.facebook.com",
    "twitter.com",
    "x.com",
    "mobile.twitter.com",
    "instagram.com",
    "www.instagram.com",
    "tiktok.com",
    "www.tiktok.com",
    "vm.tiktok.com",
    "reddit.com",
    "www.reddit.com",
    "v.redd.it",
    "streamable.com",
    "soundcloud.com",
    "www.soundcloud.com",
    "bandcamp.com",
    "bilibili.com",
    "www.bilibili.com",
    "nicovideo.jp",
    "www.nicovideo.jp",
    "rumble.com",
    "www.rumble.com",
    "odysee.com",
    "www.odysee.com",
    "kick.com",
    "www.kick.com",
];

/// Lower-cased host of `url`, without scheme, credentials, port, path, query or fragment.
///
/// Only the authority section is searched for a `user:password@` prefix, so an
/// `@` further along (`youtube.com/@channel`) is left alone.
pub fn extract_host(url: &str) -> String {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let rest = match rest[..authority_end].rfind('@') {
        Some(at) => &rest[at + 1..],
        None => rest,
    };

    let host_end = rest.find([':', '/', '?', '#']).unwrap_or(rest.len());
    rest[..host_end].to_lowercase()
}

pub fn can_resolve(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }

    let host = extract_host(url);
    if host.is_empty() {
        return false;
    }

    KNOWN_HOSTS
        .iter()
        .any(|known| host.contains(known) || known.contains(host.as_str()))
}
