use std::fmt::Display;

/// Builds PostgREST resource paths such as
/// `/rest/v1/appointments?specialist_id=eq.<id>&status=in.(pending,accepted)`.
#[derive(Debug, Clone)]
pub struct PostgrestQuery {
    table: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    select: Option<String>,
}

impl PostgrestQuery {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            select: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    /// `is.null`, `is.true`, `is.false`.
    pub fn is(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "is", value)
    }

    pub fn in_list<I, T>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        let joined = values
            .into_iter()
            .map(|value| urlencoding::encode(&value.to_string()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        self.filters.push((column.to_string(), format!("in.({})", joined)));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn path(&self) -> String {
        let mut params: Vec<String> = Vec::new();

        if let Some(select) = &self.select {
            params.push(format!("select={}", select));
        }
        for (column, expr) in &self.filters {
            params.push(format!("{}={}", column, expr));
        }
        if !self.order.is_empty() {
            params.push(format!("order={}", self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }

        if params.is_empty() {
            format!("/rest/v1/{}", self.table)
        } else {
            format!("/rest/v1/{}?{}", self.table, params.join("&"))
        }
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        let encoded = urlencoding::encode(&value.to_string()).into_owned();
        self.filters.push((column.to_string(), format!("{}.{}", op, encoded)));
        self
    }
}
