// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Streams of pages and resources.

use async_stream::try_stream;
use futures::pin_mut;
use futures::stream::{Stream, TryStreamExt};

use super::pagination::{Page, Pager, ResourcePage};
use super::Error;

impl<P: Page> Pager<P> {
    /// Turn the pager into a stream of pages.
    ///
    /// Termination rules are the same as for [each_page](#method.each_page): the stream ends
    /// on an empty page or when there is no next page, and yields at most one error.
    pub fn into_stream(self) -> impl Stream<Item = Result<P, Error>> {
        let mut state = self.into_state();
        try_stream! {
            while let Some(page) = state.fetch().await? {
                if page.is_empty()? {
                    break;
                }
                state.advance(&page)?;
                yield page;
            }
        }
    }
}

impl<P: ResourcePage> Pager<P> {
    /// Turn the pager into a stream of resources.
    ///
    /// ```rust,no_run
    /// # async fn example() -> Result<(), oscloud::Error> {
    /// use futures::pin_mut;
    /// use futures::stream::TryStreamExt;
    /// use oscloud::networking::v2::ports;
    ///
    /// let session = oscloud::Session::from_env()?;
    /// let network = session.adapter(oscloud::services::NETWORK)?;
    ///
    /// let ports = ports::list(&network, &ports::ListOpts::default()).into_item_stream();
    /// pin_mut!(ports);
    /// while let Some(port) = ports.try_next().await? {
    ///     println!("ID = {}, MAC = {}", port.id, port.mac_address);
    /// }
    /// # Ok(()) }
    /// ```
    pub fn into_item_stream(self) -> impl Stream<Item = Result<P::Item, Error>> {
        let pages = self.into_stream();
        try_stream! {
            pin_mut!(pages);
            while let Some(page) = pages.try_next().await? {
                for item in page.extract()? {
                    yield item;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use futures::stream::TryStreamExt;
    use reqwest::Url;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::pagination::test::{client, Item};
    use crate::pagination::{LinkedPage, MarkerPage, Pager};

    #[tokio::test]
    async fn test_item_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("marker", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "3"}]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "1"}, {"id": "2"}],
                "items_links": [{"href": format!("{}/items?marker=2", server.uri()), "rel": "next"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/items", server.uri())).unwrap();
        let pager: Pager<LinkedPage<Item>> = Pager::new(client().await, url);
        let ids: Vec<String> = pager
            .into_item_stream()
            .map_ok(|item| item.id)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_page_stream_stops_on_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shares"))
            .and(query_param("offset", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/shares"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/shares?limit=1", server.uri())).unwrap();
        let pager: Pager<MarkerPage<Item>> = Pager::new(client().await, url);
        let pages: Vec<_> = pager.into_stream().try_collect().await.unwrap();
        assert_eq!(pages.len(), 1);
    }
}
