//! Optional robots.txt collaborator. Caches per host; fetch failure is
//! fail-open (allow-all); longest-match-wins with `Allow` winning length
//! ties; `*` glob and terminal `$` anchor support.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    allow: bool,
}

#[derive(Debug, Default)]
struct RobotsPolicy {
    rules: Vec<Rule>,
}

impl RobotsPolicy {
    /// Parse the `User-agent: *` section (falling back to it when no
    /// specific section matches any configured agent name — we only ever
    /// check as `*`, so the two collapse into one pass).
    fn parse(body: &str) -> Self {
        let mut sections: Vec<(Vec<String>, Vec<Rule>)> = Vec::new();
        let mut current_agents: Vec<String> = Vec::new();
        let mut current_rules: Vec<Rule> = Vec::new();

        for raw_line in body.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();

            match key.as_str() {
                "user-agent" => {
                    // A new User-agent line after rules have already been
                    // recorded starts a fresh group; consecutive
                    // User-agent lines with no rules in between share one.
                    if !current_rules.is_empty() {
                        sections.push((std::mem::take(&mut current_agents), std::mem::take(&mut current_rules)));
                    }
                    current_agents.push(value.to_ascii_lowercase());
                }
                "allow" => current_rules.push(Rule { pattern: value, allow: true }),
                "disallow" => {
                    if !value.is_empty() {
                        current_rules.push(Rule { pattern: value, allow: false });
                    }
                }
                _ => {}
            }
        }
        if !current_agents.is_empty() {
            sections.push((current_agents, current_rules));
        }

        let wildcard_rules = sections
            .into_iter()
            .find(|(agents, _)| agents.iter().any(|a| a == "*"))
            .map(|(_, rules)| rules)
            .unwrap_or_default();

        Self { rules: wildcard_rules }
    }

    /// Longest matching pattern wins; `Allow` wins ties. No matching rule
    /// means allowed.
    fn is_allowed(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if !pattern_matches(&rule.pattern, path) {
                continue;
            }
            let len = rule.pattern.len();
            match best {
                None => best = Some((len, rule.allow)),
                Some((best_len, best_allow)) => {
                    if len > best_len || (len == best_len && rule.allow && !best_allow) {
                        best = Some((len, rule.allow));
                    }
                }
            }
        }
        best.map(|(_, allow)| allow).unwrap_or(true)
    }
}

/// `*` glob plus a terminal `$` anchor meaning "path ends exactly here".
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };
    let segments: Vec<&str> = pattern.split('*').collect();

    let mut cursor = 0usize;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        match path[cursor..].find(segment) {
            Some(pos) => {
                if i == 0 && pos != 0 {
                    return false;
                }
                cursor += pos + segment.len();
            }
            None => return false,
        }
    }
    if anchored {
        return cursor == path.len();
    }
    true
}

pub struct RobotsChecker {
    client: reqwest::Client,
    cache: RwLock<HashMap<String, RobotsPolicy>>,
}

impl RobotsChecker {
    pub fn new() -> theoria_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| theoria_core::Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// `true` if `url` may be fetched. Fetch failure or unparsable host
    /// fails open. Results are cached per host.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return true;
        };
        let Some(host) = parsed.host_str() else {
            return true;
        };
        let host = host.to_string();
        let path = if parsed.path().is_empty() { "/" } else { parsed.path() };

        if let Some(policy) = self.cache.read().get(&host).cloned() {
            return policy.is_allowed(path);
        }

        let robots_url = format!("{}://{}/robots.txt", parsed.scheme(), host);
        let policy = match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => RobotsPolicy::parse(&body),
                Err(_) => RobotsPolicy::default(),
            },
            _ => RobotsPolicy::default(),
        };

        let allowed = policy.is_allowed(path);
        self.cache.write().insert(host, policy);
        allowed
    }
}

impl Clone for RobotsPolicy {
    fn clone(&self) -> Self {
        Self { rules: self.rules.clone() }
    }
}
