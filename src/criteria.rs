//! Request filters translated into storage predicates

use crate::id::DocId;
use crate::model::{Review, ReviewFilter, Toy, ToyFilter, User, UserFilter};
use crate::store::Filter;

/// Conjunction of the toy filter's active constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToyCriteria {
    /// Lowercased name fragment
    name_contains: Option<String>,
    max_price: Option<f64>,
    in_stock: Option<bool>,
    any_label: Vec<String>,
}

impl ToyCriteria {
    pub fn build(filter: &ToyFilter) -> Self {
        ToyCriteria {
            name_contains: filter
                .txt
                .as_deref()
                .filter(|txt| !txt.is_empty())
                .map(str::to_lowercase),
            max_price: filter.max_price,
            in_stock: filter.in_stock,
            any_label: filter.labels.clone(),
        }
    }
}

impl Filter<Toy> for ToyCriteria {
    fn matches(&self, toy: &Toy) -> bool {
        if let Some(fragment) = &self.name_contains {
            if !toy.name.to_lowercase().contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some(max_price) = self.max_price {
            if toy.price > max_price {
                return false;
            }
        }
        if let Some(in_stock) = self.in_stock {
            if toy.in_stock != in_stock {
                return false;
            }
        }
        self.any_label.is_empty() || toy.labels.iter().any(|label| self.any_label.contains(label))
    }
}

/// Username/fullname fragment (either field) and minimum score
#[derive(Debug, Clone, Default)]
pub struct UserCriteria {
    txt: Option<String>,
    min_score: Option<i64>,
}

impl UserCriteria {
    pub fn build(filter: &UserFilter) -> Self {
        UserCriteria {
            txt: filter
                .txt
                .as_deref()
                .filter(|txt| !txt.is_empty())
                .map(str::to_lowercase),
            min_score: filter.min_score,
        }
    }
}

impl Filter<User> for UserCriteria {
    fn matches(&self, user: &User) -> bool {
        if let Some(txt) = &self.txt {
            let hit = user.username.to_lowercase().contains(txt.as_str())
                || user.fullname.to_lowercase().contains(txt.as_str());
            if !hit {
                return false;
            }
        }
        self.min_score.is_none_or(|min| user.score >= min)
    }
}

/// Exact-match on username, for the signup uniqueness pre-check and login
pub struct ByUsername<'a>(pub &'a str);

impl Filter<User> for ByUsername<'_> {
    fn matches(&self, user: &User) -> bool {
        user.username == self.0
    }
}

/// Review predicate: optional id, author and subject toy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewCriteria {
    pub id: Option<DocId>,
    pub by_user_id: Option<DocId>,
    pub about_toy_id: Option<DocId>,
}

impl ReviewCriteria {
    pub fn build(filter: &ReviewFilter) -> Self {
        ReviewCriteria {
            id: None,
            by_user_id: filter.by_user_id.clone(),
            about_toy_id: filter.about_toy_id.clone(),
        }
    }
}

impl Filter<Review> for ReviewCriteria {
    fn matches(&self, review: &Review) -> bool {
        self.id.as_ref().is_none_or(|id| &review.id == id)
            && self
                .by_user_id
                .as_ref()
                .is_none_or(|id| &review.by_user_id == id)
            && self
                .about_toy_id
                .as_ref()
                .is_none_or(|id| &review.about_toy_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(name: &str, price: f64, in_stock: bool, labels: &[&str]) -> Toy {
        Toy {
            id: DocId::generate(),
            name: name.into(),
            price,
            in_stock,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            created_at: None,
            owner: None,
            msgs: vec![],
        }
    }

    fn catalog() -> Vec<Toy> {
        vec![
            toy("Bear", 10.0, true, &["Cute"]),
            toy("Car", 20.0, false, &["Cute", "Box game"]),
            toy("Robot", 55.0, true, &["Battery Powered"]),
            toy("Puzzle", 8.0, false, &["Puzzle", "Box game"]),
        ]
    }

    fn names(filter: &ToyFilter) -> Vec<String> {
        let criteria = ToyCriteria::build(filter);
        catalog()
            .into_iter()
            .filter(|t| criteria.matches(t))
            .map(|t| t.name)
            .collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(names(&ToyFilter::default()).len(), 4);
    }

    #[test]
    fn txt_is_case_insensitive_substring() {
        let filter = ToyFilter {
            txt: Some("bO".into()),
            ..Default::default()
        };
        assert_eq!(names(&filter), vec!["Robot"]);
    }

    #[test]
    fn in_stock_false_selects_only_out_of_stock() {
        let filter = ToyFilter {
            in_stock: Some(false),
            ..Default::default()
        };
        assert_eq!(names(&filter), vec!["Car", "Puzzle"]);
    }

    #[test]
    fn labels_use_any_of_semantics() {
        let filter = ToyFilter {
            labels: vec!["Battery Powered".into(), "Box game".into()],
            ..Default::default()
        };
        assert_eq!(names(&filter), vec!["Car", "Robot", "Puzzle"]);
    }

    #[test]
    fn constraints_are_conjunctive() {
        let filter = ToyFilter {
            max_price: Some(20.0),
            in_stock: Some(false),
            labels: vec!["Cute".into()],
            ..Default::default()
        };
        assert_eq!(names(&filter), vec!["Car"]);
    }

    #[test]
    fn review_criteria_combines_id_and_author() {
        let author = DocId::generate();
        let review = Review {
            id: DocId::generate(),
            by_user_id: author.clone(),
            about_toy_id: DocId::generate(),
            txt: "fun".into(),
        };
        let own = ReviewCriteria {
            id: Some(review.id.clone()),
            by_user_id: Some(author),
            about_toy_id: None,
        };
        let foreign = ReviewCriteria {
            by_user_id: Some(DocId::generate()),
            ..own.clone()
        };
        assert!(own.matches(&review));
        assert!(!foreign.matches(&review));
    }
}
