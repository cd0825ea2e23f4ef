use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::method::Method;
use crate::config::{AuthMethod, Credentials};

/// Named query variables.
pub type Vars = Map<String, Value>;

/// A single RPC request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

/// Fresh correlation id, unique per request.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn opt_str(value: Option<&str>) -> Value {
    match value {
        Some(s) if !s.is_empty() => Value::String(s.to_string()),
        _ => Value::Null,
    }
}

impl Request {
    pub fn new(method: Method, params: Vec<Value>) -> Self {
        Self {
            id: new_request_id(),
            method,
            params,
        }
    }

    pub fn version() -> Self {
        Self::new(Method::Version, Vec::new())
    }

    /// Select namespace and database. Empty or missing names are sent as null.
    pub fn use_ns(namespace: Option<&str>, database: Option<&str>) -> Self {
        Self::new(Method::Use, vec![opt_str(namespace), opt_str(database)])
    }

    pub fn signup(params: Vars) -> Self {
        Self::new(Method::Signup, vec![Value::Object(params)])
    }

    /// Sign in with the fields the credentials' auth method needs.
    pub fn signin(credentials: &Credentials) -> Self {
        let mut params = Map::new();
        let mut put = |key: &str, value: Option<&String>| {
            if let Some(v) = value {
                params.insert(key.to_string(), Value::String(v.clone()));
            }
        };

        match credentials.method {
            AuthMethod::Root => {
                put("user", credentials.username.as_ref());
                put("pass", credentials.password.as_ref());
            }
            AuthMethod::Database => {
                put("NS", credentials.namespace.as_ref());
                put("DB", credentials.database.as_ref());
                put("user", credentials.username.as_ref());
                put("pass", credentials.password.as_ref());
            }
            AuthMethod::Record => {
                put("NS", credentials.namespace.as_ref());
                put("DB", credentials.database.as_ref());
                put("AC", credentials.access.as_ref());
                put("user", credentials.username.as_ref());
                put("pass", credentials.password.as_ref());
            }
            AuthMethod::Token | AuthMethod::Anonymous => {}
        }

        for (key, value) in &credentials.extra {
            params.insert(key.clone(), value.clone());
        }

        Self::new(Method::Signin, vec![Value::Object(params)])
    }

    pub fn authenticate(token: &str) -> Self {
        Self::new(Method::Authenticate, vec![json!(token)])
    }

    pub fn invalidate() -> Self {
        Self::new(Method::Invalidate, Vec::new())
    }

    pub fn info() -> Self {
        Self::new(Method::Info, Vec::new())
    }

    pub fn let_var(name: &str, value: Value) -> Self {
        Self::new(Method::Let, vec![json!(name), value])
    }

    pub fn unset(name: &str) -> Self {
        Self::new(Method::Unset, vec![json!(name)])
    }

    pub fn live(table: &str, diff: bool) -> Self {
        Self::new(Method::Live, vec![json!(table), json!(diff)])
    }

    pub fn kill(query_id: &str) -> Self {
        Self::new(Method::Kill, vec![json!(query_id)])
    }

    pub fn query(sql: &str, vars: Vars) -> Self {
        let mut params = vec![json!(sql)];
        if !vars.is_empty() {
            params.push(Value::Object(vars));
        }
        Self::new(Method::Query, params)
    }

    pub fn graphql(query: Value, options: Option<Vars>) -> Self {
        let mut params = vec![query];
        if let Some(options) = options {
            params.push(Value::Object(options));
        }
        Self::new(Method::Graphql, params)
    }

    pub fn select(thing: &str) -> Self {
        Self::new(Method::Select, vec![json!(thing)])
    }

    pub fn create(thing: &str, data: Option<Value>) -> Self {
        Self::new(Method::Create, with_data(thing, data))
    }

    pub fn insert(table: &str, data: Value) -> Self {
        Self::new(Method::Insert, vec![json!(table), data])
    }

    /// `table` may be omitted when every relation in `data` names its own table.
    pub fn insert_relation(table: Option<&str>, data: Value) -> Self {
        Self::new(Method::InsertRelation, vec![opt_str(table), data])
    }

    pub fn update(thing: &str, data: Option<Value>) -> Self {
        Self::new(Method::Update, with_data(thing, data))
    }

    pub fn upsert(thing: &str, data: Option<Value>) -> Self {
        Self::new(Method::Upsert, with_data(thing, data))
    }

    pub fn merge(thing: &str, data: Value) -> Self {
        Self::new(Method::Merge, vec![json!(thing), data])
    }

    /// Apply JSON Patch operations.
    pub fn patch(thing: &str, patches: Vec<Value>, diff: bool) -> Self {
        Self::new(
            Method::Patch,
            vec![json!(thing), Value::Array(patches), json!(diff)],
        )
    }

    pub fn relate(from: &str, relation: &str, to: &str, data: Option<Value>) -> Self {
        let mut params = vec![json!(from), json!(relation), json!(to)];
        if let Some(data) = data {
            params.push(data);
        }
        Self::new(Method::Relate, params)
    }

    pub fn delete(thing: &str) -> Self {
        Self::new(Method::Delete, vec![json!(thing)])
    }

    pub fn run(function: &str, version: Option<&str>, args: Vec<Value>) -> Self {
        Self::new(
            Method::Run,
            vec![json!(function), opt_str(version), Value::Array(args)],
        )
    }
}

fn with_data(thing: &str, data: Option<Value>) -> Vec<Value> {
    let mut params = vec![json!(thing)];
    if let Some(data) = data {
        params.push(data);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(method: AuthMethod) -> Credentials {
        Credentials {
            method,
            username: Some("root".to_string()),
            password: Some("secret".to_string()),
            namespace: Some("test".to_string()),
            database: Some("library".to_string()),
            access: Some("readers".to_string()),
            token: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Request::version();
        let b = Request::version();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn test_use_sends_null_for_empty_names() {
        let request = Request::use_ns(Some("test"), Some(""));
        assert_eq!(request.params, vec![json!("test"), Value::Null]);

        let request = Request::use_ns(None, Some("library"));
        assert_eq!(request.params, vec![Value::Null, json!("library")]);
    }

    #[test]
    fn test_signin_params_per_method() {
        let root = Request::signin(&credentials(AuthMethod::Root));
        assert_eq!(root.params, vec![json!({"user": "root", "pass": "secret"})]);

        let db = Request::signin(&credentials(AuthMethod::Database));
        assert_eq!(
            db.params,
            vec![json!({"NS": "test", "DB": "library", "user": "root", "pass": "secret"})]
        );

        let mut record = credentials(AuthMethod::Record);
        record.extra.insert("email".to_string(), json!("a@b.c"));
        let request = Request::signin(&record);
        assert_eq!(request.params[0]["AC"], json!("readers"));
        assert_eq!(request.params[0]["email"], json!("a@b.c"));
    }

    #[test]
    fn test_query_omits_empty_vars() {
        let request = Request::query("SELECT * FROM books", Vars::new());
        assert_eq!(request.params.len(), 1);

        let mut vars = Vars::new();
        vars.insert("_0".to_string(), json!(3));
        let request = Request::query("SELECT * FROM books LIMIT $_0", vars);
        assert_eq!(request.params[1], json!({"_0": 3}));
    }

    #[test]
    fn test_wire_form() {
        let request = Request::patch("books:a", vec![json!({"op": "replace", "path": "/title", "value": "X"})], true);
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["method"], json!("patch"));
        assert_eq!(encoded["params"][2], json!(true));

        let encoded = serde_json::to_value(Request::info()).unwrap();
        assert!(encoded.get("params").is_none());
    }
}
