//! Page state carried in the query string: active tab, the one column filter,
//! the one sort key and the notice to show.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::notice::Notice;
use crate::projection::{Column, Direction, Filter, FilterColumn, SortState};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub tab: Option<String>,
    pub filter_column: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tab {
    #[default]
    Work,
    Reviews,
    Admin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub tab: Tab,
    pub filter_column: FilterColumn,
    pub filter_value: String,
    pub sort: SortState,
    pub notice: Option<Notice>,
}

/// Header link of one sortable column: what clicking it would switch to.
#[derive(Debug, Clone, Serialize)]
pub struct SortLink {
    pub column: &'static str,
    pub label: &'static str,
    pub active: Option<Direction>,
    pub next_sort: Option<&'static str>,
    pub next_dir: Option<Direction>,
}

impl ViewState {
    /// Reads the state from query parameters. Unknown values fall back to
    /// defaults and the admin tab is only reachable for the administrator.
    pub fn from_query(query: &ViewQuery, is_admin: bool) -> Self {
        let tab = query
            .tab
            .as_deref()
            .and_then(|t| t.parse().ok())
            .filter(|tab| *tab != Tab::Admin || is_admin)
            .unwrap_or_default();

        let filter_column = query
            .filter_column
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(FilterColumn::Status);

        let sort = match query.sort.as_deref().and_then(|c| c.parse::<Column>().ok()) {
            Some(column) => {
                let direction = query
                    .dir
                    .as_deref()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(Direction::Asc);
                SortState(Some((column, direction)))
            }
            None => SortState::default(),
        };

        Self {
            tab,
            filter_column,
            filter_value: query.filter.clone().unwrap_or_default(),
            sort,
            notice: query.notice.as_deref().and_then(|n| n.parse().ok()),
        }
    }

    pub fn filter(&self) -> Option<Filter> {
        Filter::new(self.filter_column, &self.filter_value)
    }

    pub fn sort_link(&self, column: Column) -> SortLink {
        let next = self.sort.select(column);
        SortLink {
            column: column.name(),
            label: column.label(),
            active: self.sort.direction_of(column),
            next_sort: next.0.map(|(c, _)| c.name()),
            next_dir: next.0.map(|(_, d)| d),
        }
    }

    pub fn active_sort(&self) -> Option<(&'static str, Direction)> {
        self.sort.0.map(|(c, d)| (c.name(), d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ViewQuery {
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        };
        ViewQuery {
            tab: get("tab"),
            filter_column: get("filter_column"),
            filter: get("filter"),
            sort: get("sort"),
            dir: get("dir"),
            notice: get("notice"),
        }
    }

    #[test]
    fn admin_tab_requires_administrator() {
        let q = query(&[("tab", "admin")]);

        assert_eq!(ViewState::from_query(&q, true).tab, Tab::Admin);
        assert_eq!(ViewState::from_query(&q, false).tab, Tab::Work);
    }

    #[test]
    fn parses_filter_sort_and_notice() {
        let q = query(&[
            ("tab", "reviews"),
            ("filter_column", "score"),
            ("filter", "10-50"),
            ("sort", "pickup_date"),
            ("dir", "desc"),
            ("notice", "picked_up"),
        ]);
        let state = ViewState::from_query(&q, false);

        assert_eq!(state.tab, Tab::Reviews);
        assert!(matches!(state.filter(), Some(Filter::Score(Some(_)))));
        assert_eq!(state.sort, SortState(Some((Column::PickupDate, Direction::Desc))));
        assert_eq!(state.notice, Some(Notice::PickedUp));
    }

    #[test]
    fn sort_links_point_to_next_state() {
        let q = query(&[("sort", "score"), ("dir", "desc")]);
        let state = ViewState::from_query(&q, true);

        let score = state.sort_link(Column::Score);
        assert_eq!(score.active, Some(Direction::Desc));
        assert_eq!(score.next_sort, None);

        let sender = state.sort_link(Column::Sender);
        assert_eq!(sender.next_sort, Some("sender"));
        assert_eq!(sender.next_dir, Some(Direction::Asc));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let q = query(&[("tab", "x"), ("sort", "y"), ("notice", "z")]);
        let state = ViewState::from_query(&q, true);

        assert_eq!(state.tab, Tab::Work);
        assert_eq!(state.sort, SortState::default());
        assert_eq!(state.notice, None);
        assert_eq!(state.filter(), None);
    }
}
