//! Rewrites an upstream response body and status before it reaches the
//! caller. The host sink is simulated in memory; a real host would adapt
//! its connection type to `ResponseWriter`.

use std::io;

use http::{HeaderMap, Method, StatusCode, Uri};
use http_intercept::{response, Handler, HandlerFn, Request, ResponseModifier, ResponseWriter};

/// Minimal host sink that prints what it receives.
struct ConsoleSink {
    headers: HeaderMap,
}

impl ResponseWriter for ConsoleSink {
    fn write_status(&mut self, status: StatusCode) {
        println!("status: {status}");
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        println!("body:   {}", String::from_utf8_lossy(chunk));
        Ok(chunk.len())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Stands in for the host's forwarding logic: writes the upstream
    // response into whatever sink it is given.
    let upstream = HandlerFn(|w: &mut dyn ResponseWriter, _: &mut Request| {
        w.write_status(StatusCode::OK);
        w.write(b"Herman Melville - Moby-Dick").unwrap();
    });

    let middleware = response(|res: &mut ResponseModifier<'_>| {
        let body = res.read_string().unwrap();
        res.set_string(body.replace("Herman Melville - Moby-Dick", "A Long History"));
        res.set_status(StatusCode::ACCEPTED);
    })
    .wrap(upstream);

    let mut sink = ConsoleSink {
        headers: HeaderMap::new(),
    };
    let mut req = Request::new(Method::GET, Uri::from_static("http://example.com/html"));

    middleware.serve(&mut sink, &mut req).await;
}
