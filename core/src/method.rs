//! Method binding: which verb goes on the wire and whether the body goes with it.

use crate::http::{Body, HttpMethod, HttpRequest};
use crate::options::DeleteMode;

/// Verb directive handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Plain GET.
    Get,
    /// Body-carrying POST.
    Post,
    /// Explicit verb string, e.g. `PUT`.
    Custom(&'static str),
}

/// Outcome of binding one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub directive: Directive,
    pub attach_body: bool,
    /// Safe to repeat without changing server state beyond the first call.
    pub idempotent: bool,
}

impl Binding {
    pub fn verb(&self) -> &'static str {
        match self.directive {
            Directive::Get => "GET",
            Directive::Post => "POST",
            Directive::Custom(verb) => verb,
        }
    }

    /// The body that goes on the wire for `request`, if any.
    pub fn wire_body<'a>(&self, request: &'a HttpRequest) -> Option<&'a Body> {
        self.attach_body.then_some(&request.body)
    }
}

/// Decide the transport directive for `request`.
///
/// Unrecognized verbs fall back to GET and their body is ignored.
pub fn bind(request: &HttpRequest, delete_mode: DeleteMode) -> Binding {
    match &request.method {
        HttpMethod::Get => get(),
        HttpMethod::Post => Binding {
            directive: Directive::Post,
            attach_body: true,
            idempotent: false,
        },
        HttpMethod::Put => Binding {
            directive: Directive::Custom("PUT"),
            attach_body: true,
            idempotent: true,
        },
        HttpMethod::Patch => Binding {
            directive: Directive::Custom("PATCH"),
            attach_body: true,
            idempotent: false,
        },
        HttpMethod::Delete => match delete_mode {
            DeleteMode::CustomVerb => Binding {
                directive: Directive::Custom("DELETE"),
                attach_body: false,
                idempotent: true,
            },
            DeleteMode::LegacyGet => get(),
        },
        HttpMethod::Other(_) => get(),
    }
}

fn get() -> Binding {
    Binding {
        directive: Directive::Get,
        attach_body: false,
        idempotent: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(method: &str) -> HttpRequest {
        HttpRequest::new(method, "http://localhost/").with_body("payload")
    }

    #[test]
    fn get_never_attaches_body() {
        let binding = bind(&req("GET"), DeleteMode::default());
        assert_eq!(binding.directive, Directive::Get);
        assert!(binding.wire_body(&req("GET")).is_none());
    }

    #[test]
    fn post_put_patch_attach_body() {
        for (method, verb) in [("POST", "POST"), ("PUT", "PUT"), ("PATCH", "PATCH")] {
            let request = req(method);
            let binding = bind(&request, DeleteMode::default());
            assert_eq!(binding.verb(), verb);
            assert_eq!(binding.wire_body(&request), Some(&request.body));
        }
    }

    #[test]
    fn idempotence_flags() {
        assert!(bind(&req("PUT"), DeleteMode::default()).idempotent);
        assert!(!bind(&req("POST"), DeleteMode::default()).idempotent);
        assert!(!bind(&req("PATCH"), DeleteMode::default()).idempotent);
    }

    #[test]
    fn delete_custom_verb_has_no_body() {
        let binding = bind(&req("DELETE"), DeleteMode::CustomVerb);
        assert_eq!(binding.verb(), "DELETE");
        assert!(!binding.attach_body);
    }

    #[test]
    fn delete_legacy_get_routes_through_get() {
        let binding = bind(&req("delete"), DeleteMode::LegacyGet);
        assert_eq!(binding.directive, Directive::Get);
        assert!(!binding.attach_body);
    }

    #[test]
    fn unknown_verbs_fall_back_to_get() {
        let binding = bind(&req("PURGE"), DeleteMode::default());
        assert_eq!(binding.verb(), "GET");
        assert!(!binding.attach_body);
    }
}
