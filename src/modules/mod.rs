pub mod friendship {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod repository_mem;
    pub mod service;
}

pub mod friendship_stats {
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod repository_mem;
    pub mod service;
}
