//! File-host chains resolved through the shared pipeline.

mod common;

use std::sync::Arc;

use common::{init_tracing, MockFetcher};
use linkscout::config::HostsConfig;
use linkscout::stream::providers::{acefile, archivd, gofile};
use linkscout::stream::{EpisodeToken, QualityLevel, Resolver};
use linkscout::{ExtractorConfig, SiteRouter};

#[tokio::test]
async fn gofile_account_token_flows_into_contents_and_cookie() {
    init_tracing();
    let fetcher = Arc::new(
        MockFetcher::new()
            .page(
                "https://api.gofile.io/createAccount",
                r#"{"status":"ok","data":{"token":"guest-token"}}"#,
            )
            .page(
                "https://gofile.io/dist/js/alljs.js",
                r#"var fetchData = {}; fetchData.wt = "4fd6sg89d7s6";"#,
            )
            .page(
                "https://api.gofile.io/getContent?contentId=aB3-xY&token=guest-token&wt=4fd6sg89d7s6",
                r#"{"status":"ok","data":{"contents":{
                    "f1":{"name":"Frieren 03 480p.mp4","link":"https://store1.gofile.io/download/f1/480.mp4"},
                    "f2":{"name":"Frieren 03 720p.mp4","link":"https://store1.gofile.io/download/f2/720.mp4"}
                }}}"#,
            ),
    );

    let links = Resolver::new(fetcher.clone())
        .resolve(
            &gofile::source(&HostsConfig::default()),
            &EpisodeToken::page("https://gofile.io/d/aB3-xY"),
        )
        .await
        .unwrap();
    let streams: Vec<_> = links.iter().filter_map(|l| l.as_stream()).collect();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].url, "https://store1.gofile.io/download/f2/720.mp4");
    assert_eq!(streams[0].quality, QualityLevel::P720);
    assert_eq!(streams[0].label, "Gofile - 720P");
    assert_eq!(streams[1].label, "Gofile - 480P (Alt)");
    for stream in &streams {
        assert_eq!(
            stream.headers.get("Cookie").map(String::as_str),
            Some("accountToken=guest-token")
        );
    }
}

#[tokio::test]
async fn acefile_unpacks_player_and_follows_service_endpoint() {
    init_tracing();
    let player = r#"<html><script>eval(function(p,a,c,k,e,d){while(c--){if(k[c]){p=p.replace(new RegExp('\\b'+c+'\\b','g'),k[c])}}return p}('0 1 = \'2\'; $.get("https://acefile.co/service/"+1+"/check&id=110543");',10,3,'var|service|gdrive'.split('|'),0,{}))</script></html>"#;
    let fetcher = Arc::new(
        MockFetcher::new()
            .page("https://acefile.co/player/110543", player)
            .page(
                "https://acefile.co/service/gdrive/check&id=110543",
                r#"{"status":true,"data":"https:\/\/drive.example.com\/uc?id=xyz&export=download"}"#,
            ),
    );

    let links = Resolver::new(fetcher.clone())
        .resolve(
            &acefile::source(&HostsConfig::default()),
            &EpisodeToken::page("https://acefile.co/f/110543/frieren-03.mp4"),
        )
        .await
        .unwrap();

    assert_eq!(links.len(), 1);
    let stream = links[0].as_stream().unwrap();
    assert_eq!(stream.source, "Acefile");
    assert_eq!(stream.url, "https://drive.example.com/uc?id=xyz&export=download");

    let check = fetcher.request_to("check&id=110543").unwrap();
    assert_eq!(check.referer.as_deref(), Some("https://acefile.co/"));
}

#[tokio::test]
async fn archivd_reads_media_from_page_props() {
    init_tracing();
    let page = r#"<html><body><div id="app" data-page="{&quot;component&quot;:&quot;File&quot;,&quot;props&quot;:{&quot;datas&quot;:{&quot;data&quot;:{&quot;link&quot;:{&quot;media&quot;:&quot;https://media.archivd.net/v/frieren-03.mp4&quot;}}}}}"></div></body></html>"#;
    let fetcher = Arc::new(MockFetcher::new().page("https://archivd.net/file/Qw12", page));

    let links = Resolver::new(fetcher)
        .resolve(
            &archivd::source(&HostsConfig::default()),
            &EpisodeToken::page("https://archivd.net/file/Qw12"),
        )
        .await
        .unwrap();

    assert_eq!(links.len(), 1);
    let stream = links[0].as_stream().unwrap();
    assert_eq!(stream.url, "https://media.archivd.net/v/frieren-03.mp4");
    assert_eq!(stream.referer.as_deref(), Some("https://archivd.net/"));
}

#[tokio::test]
async fn animesail_keeps_one_primary_across_mirrors() {
    init_tracing();
    let episode = "https://154.26.137.28/frieren-episode-3/";
    let fetcher = Arc::new(
        MockFetcher::new()
            .page(
                episode,
                r#"<center><a class="singledl" href="/download/frieren-3/">Download</a></center>"#,
            )
            .page(
                "https://154.26.137.28/download/frieren-3/",
                r#"<table>
                    <tr><td><a data-href="https://archivd.net/file/Qw12">Archivd</a></td></tr>
                    <tr><td><a data-href="https://krakenfiles.com/view/Ab12Cd/file.html">Kraken</a></td></tr>
                </table>"#,
            )
            .page(
                "https://archivd.net/file/Qw12",
                r#"<div id="app" data-page="{&quot;props&quot;:{&quot;datas&quot;:{&quot;data&quot;:{&quot;link&quot;:{&quot;media&quot;:&quot;https://media.archivd.net/v/3.mp4&quot;}}}}}"></div>"#,
            )
            .page(
                "https://krakenfiles.com/embed-video/Ab12Cd",
                r#"<video><source src="//s3.krakencloud.net/play/video/Ab12Cd.mp4"></video>"#,
            ),
    );
    let router = SiteRouter::new(&ExtractorConfig::default(), fetcher);
    let site = router.by_name("AnimeSail").unwrap();

    let resolution = site.resolve(&EpisodeToken::page(episode)).await;
    let streams: Vec<_> = resolution.streams().collect();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].source, "Archivd");
    assert!(!streams[0].alternate);
    assert_eq!(streams[1].source, "Krakenfiles");
    assert!(streams[1].alternate);
    assert_eq!(streams[1].label, "Krakenfiles (Alt)");
}
