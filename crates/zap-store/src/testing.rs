use chrono::{SubsecRound, Utc};
use zap_types::{ContentKind, ShortCode, Zap, ZapId};

pub(crate) fn sample_zap(code: &str) -> Zap {
    Zap {
        id: ZapId::new(),
        short_code: ShortCode::parse(code).unwrap(),
        content_id: ShortCode::parse("ref000").unwrap(),
        kind: ContentKind::Url,
        display_name: Some("sample".into()),
        content_url: None,
        original_url: Some("https://example.com/page".into()),
        password_hash: None,
        view_limit: None,
        view_count: 0,
        expires_at: None,
        self_destruct: false,
        created_at: Utc::now().trunc_subsecs(6),
    }
}
