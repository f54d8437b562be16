use newsfeed_core::model::authorization_keys::AuthorizationKeys;
use newsfeed_core::model::channel::Channel;
use newsfeed_core::model::coin::Coin;
use newsfeed_core::model::links::{NewsChannel, NewsCoin, PreferencesChannelCoin};
use newsfeed_core::model::news::{News, UpdateNewsParams};
use newsfeed_core::model::raw_news::{RawNews, RawNewsWebpage};
use newsfeed_core::model::title::{Title, UpdateTitleParams};
use newsfeed_core::model::user::User;
use newsfeed_core::model::whitelist::Whitelist;
use newsfeed_core::{Context, Direction, OrEmpty, Status, Store, StoreError};
use uuid::Uuid;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn coin_upsert_overwrites_title_and_slug() {
    let store = store();
    let ctx = Context::background();
    let coins = store.provider().coins();

    coins
        .upsert(&ctx, Coin::new("BTC", "Bitcoin", "bitcoin"))
        .unwrap();
    let mut batch = vec![
        Coin::new("BTC", "Bitcoin Core", "btc"),
        Coin::new("ETH", "Ethereum", "ethereum"),
    ];
    let written = coins.upsert_batch(&ctx, &mut batch).unwrap();
    assert_eq!(written, 2);

    let btc = coins.by_codes(["BTC"]).select(&ctx).unwrap();
    assert_eq!(btc, vec![Coin::new("BTC", "Bitcoin Core", "btc")]);
    assert_eq!(coins.select(&ctx).unwrap().len(), 2);

    let err = coins
        .insert(&ctx, Coin::new("ETH", "Ether", "eth"))
        .unwrap_err();
    assert!(err.is_duplicate());
}

#[test]
fn titles_by_status_reports_not_found_and_counts() {
    let store = store();
    let ctx = Context::background();
    let titles = store.provider().titles();

    let err = titles.by_status([Status::Pending]).select(&ctx).unwrap_err();
    assert!(err.is_not_found());
    assert!(titles
        .by_status([Status::Pending])
        .select(&ctx)
        .or_empty()
        .unwrap()
        .is_empty());

    let mut batch = vec![Title::pending("a", "h-a"), Title::pending("b", "h-b")];
    titles.insert_batch(&ctx, &mut batch).unwrap();
    assert_eq!(titles.by_status([Status::Pending]).count(&ctx).unwrap(), 2);
    assert_eq!(titles.by_status([Status::Failed]).count(&ctx).unwrap(), 0);
}

#[test]
fn insert_unique_batch_skips_known_hashes() {
    let store = store();
    let ctx = Context::background();
    let titles = store.provider().titles();
    let existing = titles.insert(&ctx, Title::pending("old", "h-1")).unwrap();

    let mut batch = vec![
        Title::pending("dup", "h-1"),
        Title::pending("new", "h-2"),
    ];
    let written = titles.insert_unique_batch(&ctx, &mut batch).unwrap();

    assert_eq!(written, 1);
    assert!(batch[0].id.is_nil());
    assert!(!batch[1].id.is_nil());
    assert_eq!(titles.count(&ctx).unwrap(), 2);
    let kept = titles.by_ids([existing.id]).select(&ctx).unwrap();
    assert_eq!(kept[0].title.as_deref(), Some("old"));
}

#[test]
fn title_update_stamps_updated_at() {
    let store = store();
    let ctx = Context::background();
    let titles = store.provider().titles();
    let title = titles.insert(&ctx, Title::pending("t", "h")).unwrap();
    assert_eq!(title.updated_at, None);

    let updated = titles
        .by_ids([title.id])
        .update(&ctx, UpdateTitleParams::status(Status::Processed))
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].status, Some(Status::Processed));
    assert!(updated[0].updated_at.unwrap() > 0);
}

#[test]
fn news_filters_compose() {
    let store = store();
    let ctx = Context::background();
    let provider = store.provider();
    provider
        .coins()
        .upsert_batch(
            &ctx,
            &mut [
                Coin::new("BTC", "Bitcoin", "bitcoin"),
                Coin::new("ETH", "Ethereum", "ethereum"),
            ],
        )
        .unwrap();

    let mut items = vec![
        News {
            published_at: Some(10),
            ..News::pending("alpha")
        },
        News {
            published_at: Some(30),
            ..News::pending("beta")
        },
        News {
            published_at: Some(20),
            ..News::pending("alpha")
        },
    ];
    provider.news().insert_batch(&ctx, &mut items).unwrap();
    provider
        .news_coins()
        .insert_batch(
            &ctx,
            &mut [
                NewsCoin::new(items[0].id, "BTC"),
                NewsCoin::new(items[1].id, "ETH"),
                NewsCoin::new(items[2].id, "BTC"),
            ],
        )
        .unwrap();

    let news = provider.news();
    assert_eq!(news.by_sources(["alpha"]).count(&ctx).unwrap(), 2);
    assert_eq!(news.by_coins(["ETH"]).select(&ctx).unwrap()[0].id, items[1].id);

    let latest_btc = news.by_coins(["BTC"]).get_latest(&ctx).unwrap().unwrap();
    assert_eq!(latest_btc.id, items[2].id);

    let latest = news.get_latest(&ctx).unwrap().unwrap();
    assert_eq!(latest.published_at, Some(30));

    let one = news.by_ids([items[0].id]).get(&ctx).unwrap().unwrap();
    assert_eq!(one.source.as_deref(), Some("alpha"));
    assert!(matches!(
        news.by_sources(["alpha"]).get(&ctx),
        Err(StoreError::MultipleRows { .. })
    ));

    let processed = news
        .by_sources(["alpha"])
        .update(&ctx, UpdateNewsParams::status(Status::Processed))
        .unwrap();
    assert_eq!(processed.len(), 2);
    assert!(processed.iter().all(|item| item.updated_at.is_some()));
    assert_eq!(news.by_status([Status::Pending]).count(&ctx).unwrap(), 1);

    let failed = news
        .by_coins(["BTC"])
        .update(&ctx, UpdateNewsParams::status(Status::Failed))
        .unwrap();
    assert_eq!(failed.len(), 2);
    assert_eq!(news.by_status([Status::Failed]).count(&ctx).unwrap(), 2);
}

#[test]
fn news_linked_to_several_requested_coins_appears_once() {
    let store = store();
    let ctx = Context::background();
    let provider = store.provider();
    provider
        .coins()
        .upsert_batch(
            &ctx,
            &mut [
                Coin::new("BTC", "Bitcoin", "bitcoin"),
                Coin::new("ETH", "Ethereum", "ethereum"),
            ],
        )
        .unwrap();
    let item = provider.news().insert(&ctx, News::pending("alpha")).unwrap();
    provider
        .news_coins()
        .insert_batch(
            &ctx,
            &mut [NewsCoin::new(item.id, "BTC"), NewsCoin::new(item.id, "ETH")],
        )
        .unwrap();

    let news = provider.news().by_coins(["BTC", "ETH"]);
    assert_eq!(news.select(&ctx).unwrap().len(), 1);
    assert_eq!(news.count(&ctx).unwrap(), 1);
    let found = news.by_ids([item.id]).get(&ctx).unwrap().unwrap();
    assert_eq!(found.id, item.id);
    assert!(provider
        .news()
        .by_coins(["DOGE"])
        .select(&ctx)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn news_channels_order_by_priority_and_remove_by_source() {
    let store = store();
    let ctx = Context::background();
    let provider = store.provider();

    let mut channels = vec![
        Channel {
            priority: 5,
            ..Channel::new(100, "telegram")
        },
        Channel {
            priority: 1,
            ..Channel::new(200, "twitter")
        },
    ];
    provider.channels().insert_batch(&ctx, &mut channels).unwrap();
    assert_eq!(
        provider.channels().by_ids([200]).select(&ctx).unwrap()[0].platform.as_deref(),
        Some("twitter")
    );

    let alpha = provider.news().insert(&ctx, News::pending("alpha")).unwrap();
    let beta = provider.news().insert(&ctx, News::pending("beta")).unwrap();
    provider
        .news_channels()
        .insert_batch(
            &ctx,
            &mut [
                NewsChannel::new(100, alpha.id),
                NewsChannel::new(200, alpha.id),
                NewsChannel::new(100, beta.id),
            ],
        )
        .unwrap();

    let ordered = provider
        .news_channels()
        .ordered()
        .by_sources(["alpha"])
        .select(&ctx)
        .unwrap();
    let ids = ordered.iter().map(|link| link.channel_id).collect::<Vec<_>>();
    assert_eq!(ids, vec![200, 100]);

    let removed = provider
        .news_channels()
        .by_sources(["beta"])
        .remove(&ctx)
        .unwrap();
    assert_eq!(removed, 1);
    assert!(provider
        .news_channels()
        .by_sources(["beta"])
        .remove(&ctx)
        .unwrap_err()
        .is_not_found());
    assert_eq!(
        provider
            .news_channels()
            .by_ids([ordered[0].id])
            .select(&ctx)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn preferences_by_channel() {
    let store = store();
    let ctx = Context::background();
    let provider = store.provider();
    provider
        .coins()
        .upsert(&ctx, Coin::new("BTC", "Bitcoin", "bitcoin"))
        .unwrap();
    provider
        .channels()
        .insert_batch(
            &ctx,
            &mut [Channel::new(1, "telegram"), Channel::new(2, "telegram")],
        )
        .unwrap();
    provider
        .preferences()
        .insert_batch(
            &ctx,
            &mut [
                PreferencesChannelCoin::new(1, "BTC"),
                PreferencesChannelCoin::new(2, "BTC"),
            ],
        )
        .unwrap();

    let first = provider.preferences().by_channel(1).select(&ctx).unwrap();
    assert_eq!(first, vec![PreferencesChannelCoin::new(1, "BTC")]);
    assert_eq!(provider.preferences().by_channel(2).remove(&ctx).unwrap(), 1);
    assert_eq!(provider.preferences().select(&ctx).unwrap().len(), 1);
}

#[test]
fn users_and_whitelist_lookups() {
    let store = store();
    let ctx = Context::background();
    let provider = store.provider();

    provider
        .users()
        .insert(
            &ctx,
            User {
                username: Some("alice".to_string()),
                platform: Some("telegram".to_string()),
                ..User::default()
            },
        )
        .unwrap();
    let alice = provider.users().by_username("alice").get(&ctx).unwrap();
    assert_eq!(alice.unwrap().platform.as_deref(), Some("telegram"));
    assert!(provider.users().by_username("bob").get(&ctx).unwrap().is_none());

    let token = Uuid::new_v4();
    provider
        .whitelist()
        .insert(
            &ctx,
            Whitelist {
                username: Some("alice".to_string()),
                token: Some(token),
                ..Whitelist::default()
            },
        )
        .unwrap();
    let entry = provider.whitelist().by_username("alice").get(&ctx).unwrap();
    assert_eq!(entry.unwrap().token, Some(token));

    let wrong = provider.whitelist().extract_token(&ctx, Uuid::new_v4());
    assert!(wrong.unwrap_err().is_not_found());
    provider.whitelist().extract_token(&ctx, token).unwrap();
    assert!(provider.whitelist().get(&ctx).unwrap().is_none());
}

#[test]
fn raw_news_paging_count_and_remove() {
    let store = store();
    let ctx = Context::background();
    let provider = store.provider();
    let title = provider
        .titles()
        .insert(&ctx, Title::pending("t", "h"))
        .unwrap();

    let mut raw = (0..4)
        .map(|index| RawNews {
            title_id: title.id,
            body: Some(format!("body {index}")),
            ..RawNews::default()
        })
        .collect::<Vec<_>>();
    provider.raw_news().insert_batch(&ctx, &mut raw).unwrap();

    let page = provider
        .raw_news()
        .order("raw_news.body", Direction::Asc)
        .offset(1)
        .limit(2)
        .select(&ctx)
        .unwrap();
    let bodies = page
        .iter()
        .map(|item| item.body.clone().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(bodies, vec!["body 1", "body 2"]);
    assert_eq!(provider.raw_news().limit(1).count(&ctx).unwrap(), 4);

    let removed = provider
        .raw_news()
        .by_ids([raw[0].id, raw[3].id])
        .remove(&ctx)
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(provider.raw_news().count(&ctx).unwrap(), 2);

    let page = provider
        .raw_news_webpages()
        .insert(
            &ctx,
            RawNewsWebpage {
                body: Some("<html/>".to_string()),
                ..RawNewsWebpage::default()
            },
        )
        .unwrap();
    let pages = provider.raw_news_webpages().by_ids([page.id]);
    assert_eq!(pages.select(&ctx).unwrap().len(), 1);
    assert_eq!(pages.remove(&ctx).unwrap(), 1);
    assert!(pages.select(&ctx).unwrap_err().is_not_found());
}

#[test]
fn authorization_keys_live_in_kv_store() {
    let store = store();
    let ctx = Context::background();
    let keys = store.provider().authorization_keys();

    assert!(keys.get(&ctx).unwrap_err().is_not_found());
    let stored = AuthorizationKeys {
        authorization_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        authorization_expires_at: 1_000,
        refresh_expires_at: 2_000,
    };
    keys.insert(&ctx, stored.clone()).unwrap();
    assert_eq!(keys.get(&ctx).unwrap(), stored);

    keys.remove(&ctx).unwrap();
    keys.remove(&ctx).unwrap();
    assert!(keys.get(&ctx).unwrap_err().is_not_found());
}
