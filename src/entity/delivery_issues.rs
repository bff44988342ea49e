use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "delivery_issues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_assignment_id: Uuid,
    pub issue_description: String,
    pub reported_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_assignments::Entity",
        from = "Column::OrderAssignmentId",
        to = "super::order_assignments::Column::Id"
    )]
    OrderAssignments,
}

impl Related<super::order_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
