use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Physical condition of a second-hand copy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BookCondition {
    #[sea_orm(string_value = "brand_new")]
    BrandNew,
    #[sea_orm(string_value = "like_new")]
    LikeNew,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "well_used")]
    WellUsed,
    #[sea_orm(string_value = "tattered")]
    Tattered,
}
