//! Read queries
//!
//! A [`Query`] is built once per call and cloned for every page, so per-page
//! offsets never leak between concurrent fetches.

use super::ids::AppId;
use serde_json::Value;
use std::fmt;

/// Read query against one app
///
/// # Examples
///
/// ```
/// use kinsync::domain::ids::AppId;
/// use kinsync::domain::query::Query;
///
/// let query = Query::new(AppId::new(3).unwrap())
///     .condition(r#"status = "open""#)
///     .order_by("$id asc");
///
/// assert_eq!(
///     query.with_page(500, 500).query_string(),
///     r#"status = "open" order by $id asc limit 500 offset 500"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    app: AppId,
    condition: String,
    order_by: Option<String>,
    fields: Vec<String>,
    limit: Option<u32>,
    offset: Option<u64>,
    total_count: bool,
}

impl Query {
    /// Query matching every record of `app`
    pub fn new(app: AppId) -> Self {
        Self {
            app,
            condition: String::new(),
            order_by: None,
            fields: Vec::new(),
            limit: None,
            offset: None,
            total_count: false,
        }
    }

    /// Sets the filter condition
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Sets the `order by` clause (without the keywords)
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        let order_by = order_by.into();
        self.order_by = (!order_by.is_empty()).then_some(order_by);
        self
    }

    /// Restricts the returned fields
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Asks the server to report the total number of matches
    pub fn with_total_count(mut self, total_count: bool) -> Self {
        self.total_count = total_count;
        self
    }

    /// Copy of this query restricted to one page
    pub fn with_page(&self, offset: u64, limit: u32) -> Self {
        let mut page = self.clone();
        page.offset = Some(offset);
        page.limit = Some(limit);
        page.total_count = false;
        page
    }

    /// Copy of this query that only asks for the match count
    pub fn count_only(&self) -> Self {
        let mut count = self.clone();
        count.fields = vec!["$id".to_string()];
        count.order_by = None;
        count.limit = Some(1);
        count.offset = None;
        count.total_count = true;
        count
    }

    pub fn app(&self) -> AppId {
        self.app
    }

    pub fn condition_text(&self) -> &str {
        &self.condition
    }

    pub fn order_by_text(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn field_list(&self) -> &[String] {
        &self.fields
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn total_count(&self) -> bool {
        self.total_count
    }

    /// The `query` parameter: condition, then order, limit and offset clauses
    pub fn query_string(&self) -> String {
        let mut query = self.condition.clone();
        if let Some(order_by) = &self.order_by {
            query.push_str(" order by ");
            query.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            query.push_str(&format!(" limit {limit}"));
        }
        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            query.push_str(&format!(" offset {offset}"));
        }
        query.trim_start().to_string()
    }

    /// URL parameters for a GET request; `fields` repeats once per field
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("app".to_string(), self.app.to_string())];
        let query = self.query_string();
        if !query.is_empty() {
            params.push(("query".to_string(), query));
        }
        if self.total_count {
            params.push(("totalCount".to_string(), "true".to_string()));
        }
        for field in &self.fields {
            params.push(("fields".to_string(), field.clone()));
        }
        params
    }

    /// JSON body used when the query does not fit in a URL
    pub fn to_body(&self) -> Value {
        let mut body = serde_json::json!({ "app": self.app.get() });
        let query = self.query_string();
        if !query.is_empty() {
            body["query"] = Value::String(query);
        }
        if !self.fields.is_empty() {
            body["fields"] = serde_json::json!(self.fields);
        }
        if self.total_count {
            body["totalCount"] = Value::Bool(true);
        }
        body
    }
}

/// Condition expression builder with value escaping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition(String);

impl Condition {
    /// Wraps a hand-written condition as-is
    pub fn raw(condition: impl Into<String>) -> Self {
        Self(condition.into())
    }

    /// `field = "v1" or field = "v2" ...`
    ///
    /// ```
    /// use kinsync::domain::query::Condition;
    ///
    /// let cond = Condition::any_equal("code", ["A", r#"say "hi""#]);
    /// assert_eq!(cond.to_string(), r#"code = "A" or code = "say \"hi\"""#);
    /// ```
    pub fn any_equal<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let clauses: Vec<String> = values
            .into_iter()
            .map(|value| format!("{field} = \"{}\"", escape(value.as_ref())))
            .collect();
        Self(clauses.join(" or "))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.0
    }
}

/// Escapes a value for use inside a double-quoted query literal
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppId {
        AppId::new(10).unwrap()
    }

    #[test]
    fn test_query_string_clauses() {
        let q = Query::new(app());
        assert_eq!(q.query_string(), "");

        let q = q.condition("a = \"1\"").order_by("$id desc");
        assert_eq!(q.query_string(), "a = \"1\" order by $id desc");
        assert_eq!(
            q.with_page(0, 500).query_string(),
            "a = \"1\" order by $id desc limit 500"
        );
        assert_eq!(
            q.with_page(1000, 500).query_string(),
            "a = \"1\" order by $id desc limit 500 offset 1000"
        );
    }

    #[test]
    fn test_query_string_without_condition() {
        let q = Query::new(app()).with_page(500, 500);
        assert_eq!(q.query_string(), "limit 500 offset 500");
    }

    #[test]
    fn test_with_page_leaves_original_untouched() {
        let base = Query::new(app()).condition("x = \"y\"");
        let page = base.with_page(500, 500);
        assert_eq!(base.limit(), None);
        assert_eq!(base.offset(), None);
        assert_eq!(page.offset(), Some(500));
        assert_eq!(page.condition_text(), base.condition_text());
    }

    #[test]
    fn test_count_only() {
        let q = Query::new(app())
            .condition("x = \"y\"")
            .order_by("$id asc")
            .fields(["a", "b"])
            .count_only();
        assert!(q.total_count());
        assert_eq!(q.limit(), Some(1));
        assert_eq!(q.field_list(), ["$id".to_string()]);
        assert_eq!(q.query_string(), "x = \"y\" limit 1");
    }

    #[test]
    fn test_to_params_repeats_fields() {
        let params = Query::new(app())
            .fields(["a", "b"])
            .with_total_count(true)
            .to_params();
        assert_eq!(
            params,
            vec![
                ("app".to_string(), "10".to_string()),
                ("totalCount".to_string(), "true".to_string()),
                ("fields".to_string(), "a".to_string()),
                ("fields".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_to_body() {
        let body = Query::new(app())
            .condition("k = \"v\"")
            .fields(["k"])
            .to_body();
        assert_eq!(
            body,
            serde_json::json!({"app": 10, "query": "k = \"v\"", "fields": ["k"]})
        );
    }

    #[test]
    fn test_condition_escapes_quotes_and_backslashes() {
        let cond = Condition::any_equal("code", ["a\\b", "x\"y"]);
        assert_eq!(cond.as_str(), r#"code = "a\\b" or code = "x\"y""#);
    }

    #[test]
    fn test_condition_single_and_empty() {
        assert_eq!(
            Condition::any_equal("$id", ["5"]).to_string(),
            "$id = \"5\""
        );
        assert!(Condition::any_equal("$id", Vec::<String>::new()).is_empty());
    }
}
