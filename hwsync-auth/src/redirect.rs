use url::Url;

use crate::error::AuthError;

/// Tokens issued by the identity provider, read out of the redirect URL.
#[derive(Debug, Clone)]
pub struct AuthTokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Pull `access_token` and `refresh_token` out of a redirect URL.
///
/// Implicit-grant providers put tokens in the fragment, others in the query
/// string, so both are checked; per token the first non-empty match wins,
/// fragment before query. Missing either token fails the flow.
pub fn extract_tokens(redirect: &str) -> Result<AuthTokenPair, AuthError> {
    let url = Url::parse(redirect)
        .map_err(|e| AuthError::TokenExtraction(format!("unparseable redirect URL: {e}")))?;

    let access_token = param(&url, "access_token");
    let refresh_token = param(&url, "refresh_token");

    match (access_token, refresh_token) {
        (Some(access_token), Some(refresh_token)) => Ok(AuthTokenPair {
            access_token,
            refresh_token,
        }),
        (None, _) => Err(AuthError::TokenExtraction(
            "redirect carried no access_token".to_string(),
        )),
        (_, None) => Err(AuthError::TokenExtraction(
            "redirect carried no refresh_token".to_string(),
        )),
    }
}

fn param(url: &Url, name: &str) -> Option<String> {
    if let Some(fragment) = url.fragment() {
        let hit = url::form_urlencoded::parse(fragment.as_bytes())
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.into_owned());
        if hit.is_some() {
            return hit;
        }
    }

    url.query_pairs()
        .find(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_in_fragment() {
        let pair =
            extract_tokens("https://ext.example/oauth2#access_token=aaa&refresh_token=rrr&type=ok")
                .unwrap();
        assert_eq!(pair.access_token, "aaa");
        assert_eq!(pair.refresh_token, "rrr");
    }

    #[test]
    fn tokens_in_query() {
        let pair =
            extract_tokens("https://ext.example/oauth2?access_token=aaa&refresh_token=rrr")
                .unwrap();
        assert_eq!(pair.access_token, "aaa");
        assert_eq!(pair.refresh_token, "rrr");
    }

    #[test]
    fn fragment_wins_over_query() {
        let pair = extract_tokens(
            "https://ext.example/oauth2?access_token=query&refresh_token=query#access_token=frag&refresh_token=frag",
        )
        .unwrap();
        assert_eq!(pair.access_token, "frag");
        assert_eq!(pair.refresh_token, "frag");
    }

    #[test]
    fn empty_fragment_value_falls_back_to_query() {
        let pair = extract_tokens(
            "https://ext.example/oauth2?access_token=aaa&refresh_token=rrr#access_token=",
        )
        .unwrap();
        assert_eq!(pair.access_token, "aaa");
    }

    #[test]
    fn no_tokens_anywhere_fails() {
        let err = extract_tokens("https://ext.example/oauth2?state=xyz").unwrap_err();
        assert!(matches!(err, AuthError::TokenExtraction(_)));
    }

    #[test]
    fn missing_refresh_token_fails() {
        let err = extract_tokens("https://ext.example/oauth2#access_token=aaa").unwrap_err();
        assert!(matches!(err, AuthError::TokenExtraction(_)));
    }
}
