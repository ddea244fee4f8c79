use nsgen_bundle::renderer::render;
use nsgen_bundle::tokens::TOKENS;
use nsgen_bundle::{
    ConfigRequest, DocumentKind, MdmPlatform, Submission, TemplateDocument, TemplateSet,
    TopLevelDomain,
};
use proptest::prelude::*;
use proptest::sample::select;
use strum::IntoEnumIterator;

fn templates() -> TemplateSet {
    let every_token: String = TOKENS.iter().map(|(name, _)| format!("[{{{{{name}}}}}]")).collect();
    TemplateSet::new(vec![
        TemplateDocument::new(DocumentKind::Profile, "p.plist", every_token.clone()),
        TemplateDocument::new(DocumentKind::PreInstall, "pre.sh", format!("{every_token}\nexit 0\n")),
        TemplateDocument::new(DocumentKind::PostInstall, "post.sh", every_token),
    ])
}

fn requests() -> impl Strategy<Value = ConfigRequest> {
    (
        "[a-z0-9][a-z0-9-]{0,20}",
        select(TopLevelDomain::iter().map(|d| d.to_string()).collect::<Vec<_>>()),
        "[A-Za-z0-9]{1,32}",
        proptest::option::of("[A-Za-z0-9]{1,16}"),
        select(MdmPlatform::iter().map(|p| p.to_string()).collect::<Vec<_>>()),
        any::<bool>(),
    )
        .prop_map(|(tenant, domain, key, token, platform, multi)| ConfigRequest {
            tenant_name: tenant,
            top_level_domain: domain,
            organization_key: key,
            enrollment_auth_token: token,
            mdm_platform: platform,
            is_multi_user: multi,
            ..ConfigRequest::default()
        })
}

proptest! {
    #[test]
    fn rendering_is_pure_and_leaves_no_known_tokens(request in requests()) {
        let submission = Submission::try_from(request).unwrap();
        let first = render(&submission, &templates()).unwrap();
        let second = render(&submission, &templates()).unwrap();
        prop_assert_eq!(&first, &second);

        for document in first.documents() {
            let text = String::from_utf8(document.content.clone()).unwrap();
            for (name, _) in TOKENS {
                let token = format!("{{{{{name}}}}}");
                prop_assert!(!text.contains(&token));
            }
        }
    }

    #[test]
    fn unknown_tokens_survive_unchanged(name in "[a-z]{1,12}_x", request in requests()) {
        let submission = Submission::try_from(request).unwrap();
        let text = format!("a {{{{{name}}}}} b");
        let templates = TemplateSet::new(vec![
            TemplateDocument::new(DocumentKind::PostInstall, "post.sh", text.clone()),
        ]);

        let bundle = render(&submission, &templates).unwrap();
        prop_assert_eq!(bundle.documents()[0].content.clone(), text.into_bytes());
    }

    #[test]
    fn multi_user_flag_appears_once(request in requests()) {
        let submission = Submission::try_from(request).unwrap();
        let bundle = render(&submission, &templates()).unwrap();
        let pre = String::from_utf8(bundle.document(DocumentKind::PreInstall).unwrap().content.clone()).unwrap();
        prop_assert_eq!(pre.matches("MULTI_USER_MODE=").count(), 1);
    }
}
