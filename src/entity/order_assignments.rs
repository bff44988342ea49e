use sea_orm::entity::prelude::*;

/// A courier's claim on an order. `order_id` is unique, so at most one
/// courier can hold an order at a time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub assigned_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Orders,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CourierId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_one = "super::delivery_issues::Entity")]
    DeliveryIssues,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::delivery_issues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryIssues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
