//! Per-locale notification templates.
//!
//! Templates use `{name}` placeholders. Unknown locales fall back to English.

use std::collections::HashMap;

use serde_json::{Map, Value};

use herald_common::error::AppError;
use herald_common::types::{NotificationType, RenderedPayload};

pub const DEFAULT_LANGUAGE: &str = "en";

const DEEPLINK_SCHEME: &str = "app://";

#[derive(Debug, Clone, Copy)]
struct Template {
    title: &'static str,
    body: &'static str,
}

use NotificationType as T;

#[rustfmt::skip]
const BUILTIN: &[(NotificationType, &str, &str, &str)] = &[
    (T::Welcome, "en", "Welcome, {username}!", "Your account is ready. Start exploring now."),
    (T::Welcome, "es", "¡Bienvenido, {username}!", "Tu cuenta está lista. Empieza a explorar."),
    (T::Welcome, "de", "Willkommen, {username}!", "Dein Konto ist bereit. Leg gleich los."),

    (T::DailyBonus, "en", "Daily bonus available", "Claim your {amount} bonus before it expires."),
    (T::DailyBonus, "es", "Bono diario disponible", "Reclama tu bono de {amount} antes de que caduque."),
    (T::DailyBonus, "de", "Tagesbonus verfügbar", "Hol dir deinen Bonus von {amount}, bevor er verfällt."),

    (T::Ping, "en", "{username} pinged you", "Your team is waiting. Come back and keep going."),
    (T::Ping, "es", "{username} te ha avisado", "Tu equipo te espera. Vuelve y sigue adelante."),
    (T::Ping, "de", "{username} hat dich angestupst", "Dein Team wartet. Komm zurück und mach weiter."),

    (T::DaysOffStarted, "en", "Day off #{day} started", "Your streak is safe. {remaining} days off left."),
    (T::DaysOffStarted, "es", "Día libre #{day} iniciado", "Tu racha está a salvo. Te quedan {remaining} días libres."),
    (T::DaysOffStarted, "de", "Freier Tag #{day} begonnen", "Deine Serie ist sicher. Noch {remaining} freie Tage."),

    (T::BadgeUnlocked, "en", "New badge: {badge}", "You unlocked the {badge} badge. Well done!"),
    (T::BadgeUnlocked, "es", "Nueva insignia: {badge}", "Has desbloqueado la insignia {badge}. ¡Bien hecho!"),
    (T::BadgeUnlocked, "de", "Neues Abzeichen: {badge}", "Du hast das Abzeichen {badge} freigeschaltet. Gut gemacht!"),

    (T::LevelCompleted, "en", "Level {level} completed", "You reached level {level}. Keep it up!"),
    (T::LevelCompleted, "es", "Nivel {level} completado", "Has alcanzado el nivel {level}. ¡Sigue así!"),
    (T::LevelCompleted, "de", "Level {level} abgeschlossen", "Du hast Level {level} erreicht. Weiter so!"),

    (T::RoleChanged, "en", "New role: {role}", "You are now {role}."),
    (T::RoleChanged, "es", "Nuevo rol: {role}", "Ahora eres {role}."),
    (T::RoleChanged, "de", "Neue Rolle: {role}", "Du bist jetzt {role}."),

    (T::ContactJoined, "en", "{username} joined", "Someone from your contacts just joined. Say hi!"),
    (T::ContactJoined, "es", "{username} se ha unido", "Alguien de tus contactos acaba de unirse. ¡Salúdalo!"),
    (T::ContactJoined, "de", "{username} ist dabei", "Jemand aus deinen Kontakten ist gerade beigetreten. Sag hallo!"),

    (T::NewsAdded, "en", "{title}", "Read the latest news."),
    (T::NewsAdded, "es", "{title}", "Lee las últimas noticias."),
    (T::NewsAdded, "de", "{title}", "Lies die neuesten Nachrichten."),

    (T::AdoptionChanged, "en", "Adoption milestone {milestone} reached", "The base mining rate is now {rate}."),
    (T::AdoptionChanged, "es", "Hito de adopción {milestone} alcanzado", "La tasa base de minería es ahora {rate}."),
    (T::AdoptionChanged, "de", "Adoptions-Meilenstein {milestone} erreicht", "Die Basis-Mining-Rate beträgt jetzt {rate}."),
];

fn deeplink_path(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::Welcome => "home",
        NotificationType::DailyBonus => "home?bonus=claim",
        NotificationType::Ping => "team",
        NotificationType::DaysOffStarted => "home",
        NotificationType::BadgeUnlocked => "profile/badges",
        NotificationType::LevelCompleted => "profile/levels",
        NotificationType::RoleChanged => "profile/roles",
        NotificationType::ContactJoined => "team/agenda",
        NotificationType::NewsAdded => "news",
        NotificationType::AdoptionChanged => "home/adoption",
    }
}

pub struct Templates {
    entries: HashMap<(NotificationType, &'static str), Template>,
}

impl Templates {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|&(kind, language, title, body)| ((kind, language), Template { title, body }))
            .collect();
        Self { entries }
    }

    /// Languages with at least one template, sorted.
    pub fn supported_languages(&self) -> Vec<&'static str> {
        let mut languages: Vec<&'static str> =
            self.entries.keys().map(|&(_, language)| language).collect();
        languages.sort_unstable();
        languages.dedup();
        languages
    }

    /// Normalize `en-US` / `pt_BR` style tags and fall back to the default language.
    pub fn resolve_language(&self, kind: NotificationType, language: &str) -> &'static str {
        let base = language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        self.entries
            .keys()
            .find(|&&(k, l)| k == kind && l == base)
            .map(|&(_, l)| l)
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Render a payload for `kind` in `language`, substituting `vars`.
    ///
    /// The variables are also copied into the payload's `data`.
    pub fn render(
        &self,
        kind: NotificationType,
        language: &str,
        vars: &[(&str, String)],
    ) -> Result<RenderedPayload, AppError> {
        let language = self.resolve_language(kind, language);
        let template = self
            .entries
            .get(&(kind, language))
            .ok_or_else(|| AppError::NotFound(format!("no template for {kind} in {language}")))?;

        let mut data = Map::new();
        data.insert("type".to_string(), Value::String(kind.to_string()));
        for (name, value) in vars {
            data.insert(name.to_string(), Value::String(value.clone()));
        }

        Ok(RenderedPayload {
            title: substitute(template.title, vars),
            body: substitute(template.body, vars),
            image_url: None,
            deeplink: Some(format!("{DEEPLINK_SCHEME}{}", deeplink_path(kind))),
            data: Value::Object(data),
        })
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replace `{name}` placeholders in one left-to-right pass. Substituted values
/// are never scanned again, and unknown placeholders are kept verbatim.
fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match vars.iter().find(|(var, _)| *var == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}
