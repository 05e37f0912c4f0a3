//! Page-number pagination as a `Stream`.
//!
//! [`GridPager`] turns a page-fetching function into a stream of pages. It
//! requests `page = 1, 2, ...` (or from the query's own starting page) and
//! stops when the backend's `totalPages` is reached, when a page comes back
//! empty, or when the response is a bare array, which means the endpoint
//! does not paginate.

use futures_core::Stream;
use pin_project_lite::pin_project;
use realty_query::{GridQuery, GridResponse};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Stream of grid pages.
    ///
    /// * `F` - fetcher, called with the query for the next page
    /// * `Fut` - future returned by the fetcher
    pub struct GridPager<F, Fut>
    where
        F: FnMut(GridQuery) -> Fut,
        Fut: Future<Output = GridResponse>,
    {
        base_query: GridQuery,
        next_page: u64,
        done: bool,
        fetcher: F,
        #[pin]
        current_fetch: Option<Fut>,
    }
}

impl<F, Fut> GridPager<F, Fut>
where
    F: FnMut(GridQuery) -> Fut,
    Fut: Future<Output = GridResponse>,
{
    pub fn new(base_query: GridQuery, fetcher: F) -> Self {
        Self {
            next_page: base_query.page.unwrap_or(1).max(1),
            base_query,
            done: false,
            fetcher,
            current_fetch: None,
        }
    }
}

impl<F, Fut> Stream for GridPager<F, Fut>
where
    F: FnMut(GridQuery) -> Fut,
    Fut: Future<Output = GridResponse>,
{
    type Item = GridResponse;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.done {
                return Poll::Ready(None);
            }

            if let Some(fut) = this.current_fetch.as_mut().as_pin_mut() {
                let response = match fut.poll(cx) {
                    Poll::Ready(response) => response,
                    Poll::Pending => return Poll::Pending,
                };
                this.current_fetch.set(None);

                if response.is_empty() {
                    *this.done = true;
                    return Poll::Ready(None);
                }

                match response.total_pages() {
                    Some(total) if *this.next_page < total => *this.next_page += 1,
                    _ => *this.done = true,
                }
                return Poll::Ready(Some(response));
            }

            let query = this.base_query.with_page(*this.next_page);
            this.current_fetch.set(Some((this.fetcher)(query)));
        }
    }
}
