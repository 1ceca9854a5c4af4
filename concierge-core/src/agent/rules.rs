//! Deterministic runtime: a keyword intent classifier in place of a model.
//!
//! It follows the same tool-use policy as the model-backed runtime: outfit
//! questions trigger a weather lookup first, several tools may be chained in
//! one turn, tool errors are explained with an alternative, and at most one
//! clarifying question is asked per turn.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::{
    agent::{
        Agent,
        event::{Content, Event, Part, Role},
        runtime::{AgentRuntime, emit},
        session::Session,
    },
    tool::ToolId,
};

/// Canonical English city names and the spellings that map to them.
const CITIES: &[(&str, &[&str])] = &[
    ("Tokyo", &["tokyo", "東京", "とうきょう", "トウキョウ"]),
    ("Osaka", &["osaka", "大阪", "おおさか"]),
    ("Kyoto", &["kyoto", "京都", "きょうと"]),
    ("Sapporo", &["sapporo", "札幌"]),
    ("Taipei", &["taipei", "台北", "タイペイ"]),
    ("Manila", &["manila", "マニラ"]),
    ("Sydney", &["sydney", "シドニー"]),
    ("London", &["london", "ロンドン"]),
    ("Paris", &["paris", "パリ"]),
    ("New York", &["new york", "ニューヨーク"]),
    ("Seoul", &["seoul", "ソウル", "서울"]),
    ("Bangkok", &["bangkok", "バンコク"]),
    ("Singapore", &["singapore", "シンガポール"]),
    ("Hong Kong", &["hong kong", "香港"]),
    ("Honolulu", &["honolulu", "ホノルル"]),
];

const CURRENCIES: &[(&str, &[&str])] = &[
    ("JPY", &["jpy", "yen", "円"]),
    ("USD", &["usd", "us dollar", "us dollars", "dollar", "dollars", "ドル"]),
    ("EUR", &["eur", "euro", "euros", "ユーロ"]),
    ("GBP", &["gbp", "pound", "pounds", "sterling", "ポンド"]),
    ("PHP", &["php", "peso", "pesos", "ペソ"]),
    ("TWD", &["twd", "taiwan dollar", "taiwan dollars", "台湾ドル"]),
    ("AUD", &["aud", "australian dollar", "australian dollars", "豪ドル"]),
    ("KRW", &["krw", "won", "ウォン"]),
    ("THB", &["thb", "baht", "バーツ"]),
];

const OUTFIT_WORDS: &[&str] = &[
    "wear", "outfit", "clothes", "clothing", "dress", "pack", "着る", "着れば", "服",
];
const WEATHER_WORDS: &[&str] = &[
    "weather", "temperature", "forecast", "rain", "天気", "気温",
];
const MONEY_WORDS: &[&str] = &[
    "convert", "exchange", "how much", "換算", "両替", "替え", "変え", "いくら",
];

/// Cities offered when a lookup fails.
const SUGGESTED_CITIES: &str = "Tokyo or London";

static CITY_AFTER_PREPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|to|at|for|visiting)\s+([A-Z][A-Za-z'-]+(?:\s+[A-Z][A-Za-z'-]+)*)")
        .expect("valid city regex")
});
static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3}\b").expect("valid currency code regex"));
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(万|k\b|thousand|million)?")
        .expect("valid amount regex")
});
static CELSIUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*(?:°\s*C|℃|degrees|度)").expect("valid temperature regex")
});

/// What the user asked for, in the order it should be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Weather { city: String },
    /// Weather lookup followed by an outfit suggestion.
    Outfit { city: String },
    Convert { amount: f64, from: String, to: String },
    Clarify(String),
}

/// Split an utterance into intents. Never returns an empty list.
pub fn classify(text: &str) -> Vec<Intent> {
    let lower = text.to_ascii_lowercase();
    let mut intents: Vec<(usize, Intent)> = Vec::new();

    let city = find_city(text);
    let outfit_at = first_word(&lower, OUTFIT_WORDS);
    let weather_at = first_word(&lower, WEATHER_WORDS);
    let money_at = first_word(&lower, MONEY_WORDS);
    let mentions = find_currencies(text, money_at.is_some());

    let money_pos = [money_at, mentions.first().map(|m| m.0)].into_iter().flatten().min();
    if let Some(pos) = money_pos {
        let amount = find_amount(text);
        let intent = match (amount, mentions.as_slice()) {
            (Some(amount), [(_, from), (_, to), ..]) => Intent::Convert {
                amount,
                from: from.clone(),
                to: to.clone(),
            },
            (Some(_), [_]) => Intent::Clarify("Which currency would you like to convert into?".into()),
            (Some(_), []) => Intent::Clarify("Which currencies should I convert between?".into()),
            (None, _) => Intent::Clarify("How much money would you like to convert?".into()),
        };
        intents.push((pos, intent));
    }

    let place_pos = [outfit_at, weather_at, city.as_ref().map(|c| c.0)].into_iter().flatten().min();
    let wants_place = outfit_at.is_some() || weather_at.is_some() || (city.is_some() && money_pos.is_none());
    if let (true, Some(pos)) = (wants_place, place_pos) {
        let intent = match (city, outfit_at.is_some()) {
            (Some((_, city)), true) => Intent::Outfit { city },
            (Some((_, city)), false) => Intent::Weather { city },
            (None, _) => Intent::Clarify("Which city are you asking about?".into()),
        };
        intents.push((pos, intent));
    }

    intents.sort_by_key(|(pos, _)| *pos);
    let mut out: Vec<Intent> = intents.into_iter().map(|(_, i)| i).collect();

    // One clarifying question per turn.
    let mut asked = false;
    out.retain(|i| match i {
        Intent::Clarify(_) if asked => false,
        Intent::Clarify(_) => {
            asked = true;
            true
        }
        _ => true,
    });

    if out.is_empty() {
        out.push(Intent::Clarify(
            "I can look up the weather, suggest an outfit or convert currencies. \
             Which city or amount did you have in mind?"
                .into(),
        ));
    }
    out
}

/// Read a Celsius value out of free text such as "18°C" or "25℃".
pub fn extract_temperature(text: &str) -> Option<f64> {
    CELSIUS.captures(text).and_then(|c| c[1].parse().ok())
}

fn temperature_from(report: &Value) -> Option<f64> {
    report
        .get("temp_c")
        .and_then(Value::as_f64)
        .or_else(|| extract_temperature(&report.to_string()))
}

fn is_currency_code(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_uppercase())
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\''
}

/// Positions of `needle` in `haystack`. ASCII needles must sit on word boundaries.
fn find_words(haystack: &str, needle: &str) -> Vec<usize> {
    haystack
        .match_indices(needle)
        .map(|(i, _)| i)
        .filter(|&i| {
            if !needle.is_ascii() {
                return true;
            }
            let before = haystack[..i].chars().next_back();
            let after = haystack[i + needle.len()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .collect()
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    find_words(haystack, needle).into_iter().next()
}

fn first_word(haystack: &str, words: &[&str]) -> Option<usize> {
    words.iter().filter_map(|w| find_word(haystack, w)).min()
}

fn find_city(text: &str) -> Option<(usize, String)> {
    let lower = text.to_ascii_lowercase();
    let known = CITIES
        .iter()
        .filter_map(|(name, aliases)| first_word(&lower, aliases).map(|pos| (pos, name.to_string())))
        .min_by_key(|(pos, _)| *pos);
    if known.is_some() {
        return known;
    }

    CITY_AFTER_PREPOSITION
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .find(|m| !is_currency_code(m.as_str()))
        .map(|m| (m.start(), m.as_str().to_string()))
}

/// Currency mentions as (position, ISO code), in text order. Positions are
/// byte offsets into `text`.
///
/// Bare three-letter codes outside the alias table are only accepted when the
/// text already reads as a conversion request.
fn find_currencies(text: &str, money_context: bool) -> Vec<(usize, String)> {
    let lower = text.to_ascii_lowercase();
    let mut found: Vec<(usize, usize, &str)> = Vec::new();

    for (code, aliases) in CURRENCIES {
        for alias in aliases.iter() {
            for start in find_words(&lower, alias) {
                found.push((start, start + alias.len(), *code));
            }
        }
    }

    // Longest match wins where aliases overlap ("taiwan dollar" vs "dollar").
    found.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));
    let mut mentions: Vec<(usize, String)> = Vec::new();
    let mut covered_until = 0;
    for (start, end, code) in found {
        if start >= covered_until {
            mentions.push((start, code.to_string()));
            covered_until = end;
        }
    }

    if money_context || !mentions.is_empty() {
        for m in CURRENCY_CODE.find_iter(text) {
            if !mentions.iter().any(|(pos, _)| *pos == m.start()) {
                mentions.push((m.start(), m.as_str().to_string()));
            }
        }
        mentions.sort_by_key(|(pos, _)| *pos);
    }

    mentions
}

fn find_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT.captures(text)?;
    let base: f64 = caps[1].replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        Some(unit) if unit == "万" => 10_000.0,
        Some(unit) if unit == "k" || unit == "thousand" => 1_000.0,
        Some(unit) if unit == "million" => 1_000_000.0,
        _ => 1.0,
    };
    Some(base * multiplier)
}

fn describe_weather(report: &Value) -> String {
    let field = |k: &str| report.get(k).cloned().unwrap_or(Value::Null);
    let text = |k: &str| field(k).as_str().unwrap_or("?").to_string();
    format!(
        "{}, {} (local time {}): {}°C, {}, wind {} kph, humidity {}%.",
        text("name"),
        text("country"),
        text("localtime"),
        field("temp_c"),
        text("condition"),
        field("wind_kph"),
        field("humidity"),
    )
}

fn error_message(response: &Value) -> Option<&str> {
    (response.get("status").and_then(Value::as_str) == Some("error"))
        .then(|| response.get("error_message").and_then(Value::as_str).unwrap_or("unknown error"))
}

#[derive(Debug)]
pub struct RuleRuntime {
    agent: Agent,
}

impl RuleRuntime {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    /// Invoke one tool, recording the call and its response as events.
    async fn invoke(
        &self,
        session: &mut Session,
        events: &mpsc::Sender<Event>,
        tool: ToolId,
        args: Value,
    ) -> Value {
        let call = Content { role: Role::Model, parts: vec![Part::function_call(tool.as_str(), args.clone())] };
        emit(session, events, Event::new(&self.agent.name, call)).await;

        let response = match self.agent.tools.call(tool.as_str(), &args).await {
            Ok(value) => value,
            Err(err) => json!({ "status": "error", "error_message": err.to_string() }),
        };

        let reply = Content {
            role: Role::User,
            parts: vec![Part::function_response(tool.as_str(), response.clone())],
        };
        emit(session, events, Event::new(&self.agent.name, reply)).await;
        response
    }

    async fn weather(
        &self,
        session: &mut Session,
        events: &mpsc::Sender<Event>,
        city: &str,
    ) -> std::result::Result<Value, String> {
        let report = self.invoke(session, events, ToolId::GetWeather, json!({ "city": city })).await;
        match error_message(&report) {
            Some(err) => Err(format!(
                "I couldn't get the weather for {city} ({err}). \
                 You could try another city such as {SUGGESTED_CITIES}, or check the spelling."
            )),
            None => Ok(report),
        }
    }
}

#[async_trait]
impl AgentRuntime for RuleRuntime {
    fn name(&self) -> &str {
        "rules"
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        message: Content,
        events: mpsc::Sender<Event>,
    ) -> Result<()> {
        let text = message
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        session.append(Event::new("user", message));

        let intents = classify(&text);
        tracing::info!(?intents, "classified utterance");

        let mut lines: Vec<String> = Vec::new();
        let mut question: Option<String> = None;

        for intent in intents {
            match intent {
                Intent::Weather { city } => match self.weather(session, &events, &city).await {
                    Ok(report) => lines.push(describe_weather(&report)),
                    Err(apology) => lines.push(apology),
                },
                Intent::Outfit { city } => {
                    let report = match self.weather(session, &events, &city).await {
                        Ok(report) => report,
                        Err(apology) => {
                            lines.push(apology);
                            question.get_or_insert_with(|| "Which city should I check instead?".into());
                            continue;
                        }
                    };
                    lines.push(describe_weather(&report));

                    let Some(temp_c) = temperature_from(&report) else {
                        question.get_or_insert_with(|| format!("Could you confirm the city you mean by {city}?"));
                        continue;
                    };
                    let outfit = self
                        .invoke(session, &events, ToolId::SuggestOutfit, json!({ "temp_c": temp_c }))
                        .await;
                    match outfit.get("suggestion").and_then(Value::as_str) {
                        Some(suggestion) => {
                            lines.push(format!("Suggested outfit: {suggestion} (based on {temp_c}°C)."))
                        }
                        None => lines.push("I couldn't work out an outfit suggestion this time.".into()),
                    }
                }
                Intent::Convert { amount, from, to } => {
                    let result = self
                        .invoke(
                            session,
                            &events,
                            ToolId::ConvertCurrency,
                            json!({ "amount": amount, "from_currency": from, "to_currency": to }),
                        )
                        .await;
                    let line = match error_message(&result) {
                        Some(err) => format!(
                            "I couldn't convert {from} to {to} ({err}). \
                             Please check the currency codes, for example JPY, USD or GBP."
                        ),
                        None => {
                            let converted = result.get("converted").and_then(Value::as_f64).unwrap_or_default();
                            let rate = result.get("rate").and_then(Value::as_f64).unwrap_or_default();
                            format!("{amount} {from} ≈ {converted:.2} {to} (rate {rate}).")
                        }
                    };
                    lines.push(line);
                }
                Intent::Clarify(q) => {
                    question.get_or_insert(q);
                }
            }
        }

        if let Some(q) = question {
            lines.push(q);
        }

        emit(session, &events, Event::new(&self.agent.name, Content::model(lines.join("\n")))).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{
        ToolRegistry, currency::ExchangeRateTool, outfit::OutfitTool, weather::WeatherApiTool,
    };
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn outfit_question_chains_weather() {
        assert_eq!(
            classify("I'm going to Sydney, what should I wear?"),
            vec![Intent::Outfit { city: "Sydney".into() }]
        );
    }

    #[test]
    fn weather_and_outfit_in_one_question_is_one_intent() {
        assert_eq!(
            classify("How's the weather in Taipei? I'd also like a suggestion for what to wear."),
            vec![Intent::Outfit { city: "Taipei".into() }]
        );
    }

    #[test]
    fn conversion_then_weather_in_text_order() {
        assert_eq!(
            classify("How much is 10,000 yen in pesos? And the weather in Manila too."),
            vec![
                Intent::Convert { amount: 10_000.0, from: "JPY".into(), to: "PHP".into() },
                Intent::Weather { city: "Manila".into() },
            ]
        );
    }

    #[test]
    fn japanese_utterances_are_normalized() {
        assert_eq!(
            classify("1万円をペソに変えるといくら？あとマニラの天気も。"),
            vec![
                Intent::Convert { amount: 10_000.0, from: "JPY".into(), to: "PHP".into() },
                Intent::Weather { city: "Manila".into() },
            ]
        );
        assert_eq!(
            classify("とうきょうに行くけど何を着ればいい？"),
            vec![Intent::Outfit { city: "Tokyo".into() }]
        );
    }

    #[test]
    fn unknown_city_taken_from_preposition() {
        assert_eq!(
            classify("What's the weather in Lisbon?"),
            vec![Intent::Weather { city: "Lisbon".into() }]
        );
    }

    #[test]
    fn bare_codes_count_in_conversion_requests() {
        assert_eq!(
            classify("Convert 250 CHF to SEK"),
            vec![Intent::Convert { amount: 250.0, from: "CHF".into(), to: "SEK".into() }]
        );
    }

    #[test]
    fn overlapping_aliases_prefer_longest() {
        let mentions = find_currencies("100 taiwan dollars to yen", false);
        assert_eq!(mentions.iter().map(|m| m.1.as_str()).collect::<Vec<_>>(), ["TWD", "JPY"]);
    }

    #[test]
    fn non_ascii_text_keeps_code_positions_aligned() {
        let mentions = find_currencies("İstanbul trip: convert 100 USD to EUR", true);
        assert_eq!(mentions.iter().map(|m| m.1.as_str()).collect::<Vec<_>>(), ["USD", "EUR"]);

        assert_eq!(
            classify("İstanbul trip: convert 100 USD to EUR"),
            vec![Intent::Convert { amount: 100.0, from: "USD".into(), to: "EUR".into() }]
        );
    }

    #[test]
    fn word_boundaries_apply_to_ascii_aliases() {
        assert_eq!(find_city("a comparison of prices"), None);
        assert!(find_currencies("a compound interest question", false).is_empty());
    }

    #[test]
    fn missing_details_ask_one_question() {
        let intents = classify("What should I wear? And convert some yen please");
        let questions = intents.iter().filter(|i| matches!(i, Intent::Clarify(_))).count();
        assert_eq!(questions, 1);

        assert!(matches!(classify("hello there").as_slice(), [Intent::Clarify(_)]));
    }

    #[test]
    fn amounts_with_units() {
        assert_eq!(find_amount("1万円"), Some(10_000.0));
        assert_eq!(find_amount("5k dollars"), Some(5_000.0));
        assert_eq!(find_amount("12.5 euros"), Some(12.5));
        assert_eq!(find_amount("no number"), None);
    }

    #[test]
    fn temperature_from_text() {
        assert_eq!(extract_temperature("Sunny, 18°C and dry"), Some(18.0));
        assert_eq!(extract_temperature("気温は25℃です"), Some(25.0));
        assert_eq!(extract_temperature("about -3.5 degrees"), Some(-3.5));
        assert_eq!(extract_temperature("no reading"), None);

        assert_eq!(temperature_from(&json!({ "temp_c": 12.0 })), Some(12.0));
        assert_eq!(temperature_from(&json!({ "condition": "Mild, 16°C" })), Some(16.0));
    }

    fn runtime_with_weather(server: &MockServer) -> RuleRuntime {
        let mut tools = ToolRegistry::new();
        tools.register(WeatherApiTool::with_base_url("KEY".into(), server.uri()));
        tools.register(OutfitTool);
        RuleRuntime::new(Agent::new("rules", tools))
    }

    fn called_tools(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| e.content.as_ref())
            .flat_map(|c| c.function_calls().map(|f| f.name.clone()).collect::<Vec<_>>())
            .collect()
    }

    async fn run(rt: &RuleRuntime, text: &str) -> Vec<Event> {
        let mut session = Session::new("app", "user", "sess");
        let (tx, mut rx) = mpsc::channel(32);
        rt.run_turn(&mut session, Content::user(text), tx).await.unwrap();
        let mut out = Vec::new();
        while let Some(ev) = rx.recv().await {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn outfit_turn_calls_weather_then_outfit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Sydney"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": { "name": "Sydney", "country": "Australia", "localtime": "2025-01-10 13:45" },
                "current": { "temp_c": 27.0, "condition": { "text": "Sunny" }, "wind_kph": 10.0, "humidity": 40 }
            })))
            .mount(&server)
            .await;

        let rt = runtime_with_weather(&server);
        let events = run(&rt, "I'm going to Sydney, what should I wear?").await;

        assert_eq!(called_tools(&events), ["get_weather", "suggest_outfit"]);

        let last = events.last().unwrap();
        assert!(last.is_final_response());
        let reply = last.content.as_ref().unwrap().first_text().unwrap();
        assert!(reply.contains("Sydney, Australia"));
        assert!(reply.contains("Short sleeves and light clothing"));
    }

    #[tokio::test]
    async fn conversion_and_weather_share_one_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/KEY/latest/JPY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "success",
                "conversion_rates": { "PHP": 0.37, "USD": 0.0067 }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("q", "Manila"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": { "name": "Manila", "country": "Philippines", "localtime": "2025-01-10 12:00" },
                "current": { "temp_c": 31.0, "condition": { "text": "Partly cloudy" }, "wind_kph": 12.0, "humidity": 70 }
            })))
            .mount(&server)
            .await;

        let mut tools = ToolRegistry::new();
        tools.register(WeatherApiTool::with_base_url("KEY".into(), server.uri()));
        tools.register(ExchangeRateTool::with_base_url("KEY".into(), server.uri()));
        let rt = RuleRuntime::new(Agent::new("rules", tools));

        let events = run(&rt, "How much is 10,000 yen in pesos? And the weather in Manila too.").await;
        assert_eq!(called_tools(&events), ["convert_currency", "get_weather"]);

        let last = events.last().unwrap();
        assert!(last.is_final_response());
        let reply = last.content.as_ref().unwrap().first_text().unwrap();
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "10000 JPY ≈ 3700.00 PHP (rate 0.37).");
        assert!(lines[1].starts_with("Manila, Philippines (local time 2025-01-10 12:00)"));
        assert!(lines[1].contains("Partly cloudy"));
    }

    #[tokio::test]
    async fn weather_failure_is_explained_with_alternative() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("No matching location found."))
            .mount(&server)
            .await;

        let rt = runtime_with_weather(&server);
        let events = run(&rt, "What should I wear in Osaka?").await;

        let reply = events.last().unwrap().content.as_ref().unwrap().first_text().unwrap().to_string();
        assert!(reply.contains("I couldn't get the weather for Osaka"));
        assert!(reply.contains(SUGGESTED_CITIES));
        assert_eq!(reply.matches('?').count(), 1);
    }

    #[tokio::test]
    async fn missing_tool_is_reported_not_raised() {
        let rt = RuleRuntime::new(Agent::new("rules", ToolRegistry::new()));
        let events = run(&rt, "Convert 100 USD to EUR").await;

        let reply = events.last().unwrap().content.as_ref().unwrap().first_text().unwrap().to_string();
        assert!(reply.contains("I couldn't convert USD to EUR"));
    }
}
