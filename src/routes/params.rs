use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RestaurantSort {
    Rating,
    Newest,
}

impl RestaurantSort {
    pub fn as_order_clause(&self) -> &'static str {
        match self {
            RestaurantSort::Rating => "rating_average DESC",
            RestaurantSort::Newest => "created_at DESC",
        }
    }
}

// Pagination fields are inlined rather than flattened: serde_urlencoded
// cannot deserialize numeric fields through #[serde(flatten)], so a
// flattened struct would reject ?page=2&per_page=10 outright.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RestaurantQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub cuisine: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub sort: Option<RestaurantSort>,
}

impl RestaurantQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Pagination, RestaurantQuery};
    use axum::extract::Query;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let defaults = Pagination {
            page: None,
            per_page: None,
        };
        assert_eq!(defaults.normalize(), (1, 20, 0));
    }

    #[test]
    fn restaurant_query_parses_numeric_pagination_from_uri() {
        let uri: axum::http::Uri = "/api/restaurants?page=2&per_page=10&search=pizza&sort=rating"
            .parse()
            .unwrap();
        let Query(query) = Query::<RestaurantQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.page, Some(2));
        assert_eq!(query.per_page, Some(10));
        assert_eq!(query.search.as_deref(), Some("pizza"));
        assert_eq!(query.pagination().normalize(), (2, 10, 10));
    }

    #[test]
    fn restaurant_query_defaults_when_no_parameters_given() {
        let uri: axum::http::Uri = "/api/restaurants".parse().unwrap();
        let Query(query) = Query::<RestaurantQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.page, None);
        assert_eq!(query.pagination().normalize(), (1, 20, 0));
    }
}
