//! Whether a picture should carry a watermark at all.
//!
//! The compositor only sees the resulting [`Eligibility`]; the usage lookups
//! run against an injected [`PictureUsage`] before rendering starts.

use super::WatermarkSettings;
use crate::storage::{PictureUsage, StorageError};

/// Outcome of the usage check for one picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub required: bool,
}

impl Eligibility {
    pub fn required() -> Self {
        Self { required: true }
    }

    pub fn not_required() -> Self {
        Self { required: false }
    }
}

/// True iff the picture is referenced by an entity kind whose switch is on.
///
/// Lookups short-circuit in product, category, manufacturer order.
pub async fn is_watermark_required<U: PictureUsage + ?Sized>(
    usage: &U,
    picture_id: i32,
    settings: &WatermarkSettings,
) -> Result<bool, StorageError> {
    if settings.apply_on_product_pictures && usage.is_referenced_by_product(picture_id).await? {
        return Ok(true);
    }

    if settings.apply_on_category_pictures && usage.is_referenced_by_category(picture_id).await? {
        return Ok(true);
    }

    if settings.apply_on_manufacturer_pictures
        && usage.is_referenced_by_manufacturer(picture_id).await?
    {
        return Ok(true);
    }

    Ok(false)
}

/// Evaluate eligibility, skipping the lookups when no layer could draw.
pub async fn evaluate<U: PictureUsage + ?Sized>(
    usage: &U,
    picture_id: i32,
    settings: &WatermarkSettings,
) -> Result<Eligibility, StorageError> {
    if !settings.applies_anywhere()
        || !(settings.text_layer_active() || settings.picture_layer_active())
    {
        return Ok(Eligibility::not_required());
    }

    let required = is_watermark_required(usage, picture_id, settings).await?;
    Ok(Eligibility { required })
}
