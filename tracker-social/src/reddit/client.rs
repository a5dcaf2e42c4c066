//! Reddit OAuth client.
//!
//! Authenticates with the application-only grant, then talks to the OAuth API
//! host with a bearer token. Listings are paged with the `after` cursor, and the
//! client waits out the rate-limit window when Reddit reports it exhausted.
use std::borrow::Cow;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_stream::stream;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracker_config::RedditConfig;
use tracker_http::{Auth, HeaderMap, HttpClient, JsonResponse, RequestOpts, StatusCode};

use super::api::{ApiError, RedditApi, Submissions};
use super::forest::CommentForest;
use super::types::{
    Identity, Listing, ListingData, MoreChildren, MoreChildrenResponse, Thing, TokenResponse,
};

/// Largest page the listing endpoints hand out.
const PAGE_SIZE: usize = 100;
/// Largest id batch `/api/morechildren` accepts.
const MORE_CHILDREN_BATCH: usize = 100;
/// Reddit windows last ten minutes; longer resets are clamped to this.
const MAX_RESET: Duration = Duration::from_secs(600);

type Query<'a> = Vec<(&'a str, Cow<'a, str>)>;

#[derive(Debug, Default, Clone, Copy)]
struct RateWindow {
    remaining: Option<f64>,
    reset_at: Option<Instant>,
}

impl RateWindow {
    fn observe(&mut self, headers: &HeaderMap, now: Instant) {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
        };
        if let Some(remaining) = number("x-ratelimit-remaining") {
            self.remaining = Some(remaining);
        }
        if let Some(reset) = number("x-ratelimit-reset").filter(|r| r.is_finite()) {
            let wait = reset.clamp(0.0, MAX_RESET.as_secs_f64());
            if let Some(at) = Duration::try_from_secs_f64(wait)
                .ok()
                .and_then(|wait| now.checked_add(wait))
            {
                self.reset_at = Some(at);
            }
        }
    }

    /// How long to hold off before the next request, if the budget is spent.
    fn pause(&self, now: Instant) -> Option<Duration> {
        match (self.remaining, self.reset_at) {
            (Some(remaining), Some(at)) if remaining < 1.0 && at > now => Some(at - now),
            _ => None,
        }
    }
}

pub struct RedditClient {
    http: HttpClient,
    token: String,
    rate: Mutex<RateWindow>,
}

impl RedditClient {
    /// Exchange the application credentials for a bearer token.
    pub async fn authenticate(cfg: &RedditConfig) -> Result<Self, ApiError> {
        if cfg.client_id.trim().is_empty() || cfg.client_secret.trim().is_empty() {
            return Err(ApiError::Auth("client id and secret are required".into()));
        }

        let timeout = Duration::from_secs(cfg.timeout_secs);
        let auth_http = HttpClient::new(&cfg.auth_base_url)?
            .with_timeout(timeout)
            .with_retries(cfg.max_retries)
            .with_user_agent(&cfg.user_agent)?;

        let token: TokenResponse = auth_http
            .post_form(
                "api/v1/access_token",
                &[("grant_type", "client_credentials")],
                RequestOpts {
                    auth: Some(Auth::Basic {
                        user: &cfg.client_id,
                        pass: &cfg.client_secret,
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| match e.status() {
                Some(status) if status == StatusCode::UNAUTHORIZED => ApiError::Auth(e.to_string()),
                _ => ApiError::Http(e),
            })?;

        let access_token = match (token.access_token, token.error) {
            (Some(t), None) if !t.is_empty() => t,
            (_, Some(err)) => return Err(ApiError::Auth(err)),
            _ => return Err(ApiError::Auth("token response carried no access_token".into())),
        };
        tracing::info!(
            scope = token.scope.as_deref().unwrap_or(""),
            expires_in = token.expires_in.unwrap_or(0),
            "reddit.auth.ok"
        );

        let http = HttpClient::new(&cfg.api_base_url)?
            .with_timeout(timeout)
            .with_retries(cfg.max_retries)
            .with_user_agent(&cfg.user_agent)?;

        Ok(Self {
            http,
            token: access_token,
            rate: Mutex::new(RateWindow::default()),
        })
    }

    async fn get<T>(&self, path: &str, mut query: Query<'_>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let pause = self.window().pause(Instant::now());
        if let Some(pause) = pause {
            tracing::warn!(wait_ms = pause.as_millis() as u64, path, "reddit.ratelimit.wait");
            tokio::time::sleep(pause).await;
        }

        query.push(("raw_json", Cow::Borrowed("1")));
        let resp: JsonResponse<T> = self
            .http
            .get_json_response(
                path,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.token)),
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await?;

        self.window().observe(&resp.headers, Instant::now());
        Ok(resp.body)
    }

    fn window(&self) -> std::sync::MutexGuard<'_, RateWindow> {
        self.rate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Page through a submission listing until `limit` items or the cursor runs out.
    fn listing(
        &self,
        path: String,
        params: Vec<(&'static str, String)>,
        limit: usize,
    ) -> Submissions<'_> {
        Box::pin(stream! {
            let mut after: Option<String> = None;
            let mut yielded = 0usize;
            while yielded < limit {
                let mut query: Query<'_> = params
                    .iter()
                    .map(|(k, v)| (*k, Cow::Borrowed(v.as_str())))
                    .collect();
                query.push(("limit", Cow::Owned((limit - yielded).min(PAGE_SIZE).to_string())));
                if let Some(cursor) = &after {
                    query.push(("after", Cow::Borrowed(cursor.as_str())));
                }

                let page: Listing = match self.get(&path, query).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let ListingData { after: next, children } = page.data;
                tracing::debug!(path = %path, items = children.len(), more = next.is_some(), "reddit.listing.page");

                let mut page_items = 0usize;
                for thing in children {
                    if let Thing::Submission(s) = thing {
                        page_items += 1;
                        yielded += 1;
                        yield Ok(*s);
                        if yielded >= limit {
                            return;
                        }
                    }
                }

                match next {
                    Some(cursor) if page_items > 0 => after = Some(cursor),
                    _ => break,
                }
            }
        })
    }

    async fn continue_thread(&self, link_id: &str, more: &MoreChildren) -> Result<Vec<Thing>, ApiError> {
        let post = link_id.strip_prefix("t3_").unwrap_or(link_id);
        let parent = more.parent_id.strip_prefix("t1_").unwrap_or(&more.parent_id);
        let (_, comments): (Listing, Listing) = self
            .get(&format!("comments/{post}/_/{parent}"), Vec::new())
            .await?;

        let focus = comments.data.children.into_iter().find_map(|thing| match thing {
            Thing::Comment(c) if c.id == parent => Some(c),
            _ => None,
        });
        Ok(focus.map(|c| c.replies).unwrap_or_default())
    }
}

#[async_trait]
impl RedditApi for RedditClient {
    async fn identity(&self) -> Result<Identity, ApiError> {
        match self.get::<Identity>("api/v1/me", Vec::new()).await {
            Ok(identity) => Ok(identity),
            // Application-only tokens have no user; the token itself was accepted.
            Err(ApiError::Http(e)) if e.status() == Some(StatusCode::FORBIDDEN) => {
                Ok(Identity::application())
            }
            Err(e) => Err(e),
        }
    }

    fn top(&self, subreddit: &str, time_filter: &str, limit: usize) -> Submissions<'_> {
        self.listing(
            format!("r/{subreddit}/top"),
            vec![("t", time_filter.to_string())],
            limit,
        )
    }

    fn search(
        &self,
        subreddit: &str,
        query: &str,
        time_filter: &str,
        limit: usize,
    ) -> Submissions<'_> {
        self.listing(
            format!("r/{subreddit}/search"),
            vec![
                ("q", query.to_string()),
                ("restrict_sr", "1".to_string()),
                ("sort", "relevance".to_string()),
                ("t", time_filter.to_string()),
            ],
            limit,
        )
    }

    async fn comment_forest(&self, post_id: &str) -> Result<CommentForest, ApiError> {
        let id = post_id.strip_prefix("t3_").unwrap_or(post_id);
        let (_, comments): (Listing, Listing) =
            self.get(&format!("comments/{id}"), Vec::new()).await?;
        Ok(CommentForest::new(id, comments.data.children))
    }

    async fn expand_more(
        &self,
        link_id: &str,
        more: &MoreChildren,
    ) -> Result<Vec<Thing>, ApiError> {
        if more.is_continue_thread() {
            return self.continue_thread(link_id, more).await;
        }

        let mut things = Vec::new();
        for batch in more.children.chunks(MORE_CHILDREN_BATCH) {
            let resp: MoreChildrenResponse = self
                .get(
                    "api/morechildren",
                    vec![
                        ("api_type", Cow::Borrowed("json")),
                        ("link_id", Cow::Borrowed(link_id)),
                        ("children", Cow::Owned(batch.join(","))),
                    ],
                )
                .await?;
            if !resp.json.errors.is_empty() {
                let errors: Vec<String> = resp.json.errors.iter().map(|e| e.to_string()).collect();
                return Err(ApiError::Remote(errors.join("; ")));
            }
            things.extend(resp.json.data.unwrap_or_default().things);
        }
        Ok(things)
    }
}
