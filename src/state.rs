use crate::{
    db::{DbPool, OrmConn, orm_from_pool},
    forms::FormTokens,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub forms: FormTokens,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            pool,
            orm,
            forms: FormTokens::new(),
        }
    }
}
