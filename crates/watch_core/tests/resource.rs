use watch_core::ResourceRef;

fn init_logging() {
    watch_logging::initialize_for_tests();
}

#[test]
fn accepts_post_urls_with_and_without_www_and_trailing_slash() {
    init_logging();
    for url in [
        "https://www.instagram.com/p/C0dE_x-9/",
        "https://instagram.com/p/C0dE_x-9",
        "  https://www.instagram.com/p/C0dE_x-9/\n",
    ] {
        let parsed = ResourceRef::parse(url).expect("valid reference");
        assert_eq!(parsed.code(), "C0dE_x-9");
    }
}

#[test]
fn rejects_malformed_references() {
    init_logging();
    for url in [
        "not a url",
        "http://www.instagram.com/p/abc/",
        "https://example.com/p/abc/",
        "https://www.instagram.com/reel/abc/",
        "https://www.instagram.com/p/",
        "https://www.instagram.com/p/abc/extra",
        "https://www.instagram.com/p/abc/?utm=1",
        "https://www.instagram.com/p/abc/#top",
        "https://www.instagram.com/p/a.b/",
        "https://user:pw@www.instagram.com/p/abc/",
        "https://www.instagram.com:443/p/abc/",
        "https://WWW.INSTAGRAM.COM/p/abc/",
        "https:www.instagram.com/p/abc",
        "https://www.instagram.com/x/../p/abc/",
        "https://evilinstagram.com/p/abc/",
    ] {
        let err = ResourceRef::parse(url).unwrap_err();
        assert_eq!(err.reference, url);
    }
}
