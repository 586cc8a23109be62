//! Canonical thumbnail file names.
//!
//! `{id:07}[_{seo}][_{size}][_{store}].{ext}`: the SEO part is omitted when
//! empty, the size when 0 and the store for the default store.

/// File extension for a MIME type: the subtype, with legacy aliases mapped.
pub fn extension_from_mime(mime_type: &str) -> String {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    let subtype = essence
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match subtype.as_str() {
        "pjpeg" => "jpg".to_string(),
        "x-png" => "png".to_string(),
        "x-icon" => "ico".to_string(),
        _ => subtype,
    }
}

/// MIME type for a file extension, used for the placeholder picture.
pub fn mime_from_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Thumbnail file name for a picture.
///
/// `store_id` is `None` for the default store.
pub fn thumb_file_name(
    picture_id: i32,
    seo_filename: Option<&str>,
    target_size: u32,
    store_id: Option<i32>,
    extension: &str,
) -> String {
    let mut name = format!("{:07}", picture_id);

    if let Some(seo) = seo_filename.filter(|s| !s.is_empty()) {
        name.push('_');
        name.push_str(seo);
    }

    if target_size != 0 {
        name.push_str(&format!("_{}", target_size));
    }

    if let Some(store_id) = store_id {
        name.push_str(&format!("_{}", store_id));
    }

    name.push('.');
    name.push_str(extension);
    name
}

/// File name of the placeholder picture at a target size:
/// `default-image.png` becomes `default-image_100.png`.
pub fn default_thumb_file_name(default_name: &str, target_size: u32) -> String {
    if target_size == 0 {
        return default_name.to_string();
    }

    match default_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, target_size, ext),
        _ => format!("{}_{}", default_name, target_size),
    }
}
