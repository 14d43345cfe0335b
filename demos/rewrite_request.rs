//! Reads and replaces an inbound request body before it is forwarded,
//! gated on the request method.

use std::io;

use http::{HeaderMap, Method, StatusCode, Uri};
use http_intercept::{request, Body, Handler, HandlerFn, Request, RequestModifier, ResponseWriter};

struct ConsoleSink {
    headers: HeaderMap,
}

impl ResponseWriter for ConsoleSink {
    fn write_status(&mut self, _status: StatusCode) {}

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        Ok(chunk.len())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let forward = HandlerFn(|_: &mut dyn ResponseWriter, req: &mut Request| {
        let body = req.body.read_all().unwrap();
        println!("forwarded body: {}", String::from_utf8_lossy(&body));
    });

    let middleware = request(|req: &mut RequestModifier<'_>| {
        let body = req.read_string().unwrap();
        println!("inbound body:   {body}");
        req.set_string("foo bar");
    })
    .filter(|req| req.method == Method::POST)
    .wrap(forward);

    let mut sink = ConsoleSink {
        headers: HeaderMap::new(),
    };
    let mut req = Request::new(Method::POST, Uri::from_static("http://example.com/"));
    req.body = Body::from("original payload");

    middleware.serve(&mut sink, &mut req).await;
}
