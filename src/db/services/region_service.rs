use sqlx::PgPool;

use crate::db::models::Region;

/// Looks up the region for a Trafikverket county number.
pub async fn get_region_by_county(pool: &PgPool, county_no: i32) -> sqlx::Result<Option<Region>> {
    sqlx::query_as::<_, Region>(
        "SELECT location_id, county_no, region FROM location WHERE county_no = $1",
    )
    .bind(county_no)
    .fetch_optional(pool)
    .await
}

/// All known regions, ordered by county number ascending. The poll loop
/// iterates this list, so the order fixes the per-cycle processing order.
pub async fn list_regions(pool: &PgPool) -> sqlx::Result<Vec<Region>> {
    sqlx::query_as::<_, Region>(
        "SELECT location_id, county_no, region FROM location ORDER BY county_no ASC",
    )
    .fetch_all(pool)
    .await
}
