use natsocks::origdst;
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn resolving_twice_gives_the_same_answer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let _client = TcpStream::connect(addr).await.unwrap();
    let (accepted, _) = listener.accept().await.unwrap();

    let first = origdst::resolve(&accepted);
    let second = origdst::resolve(&accepted);
    assert_eq!(first, second);

    // without a DNAT rule there is either no mapping or the real target
    assert!(first.is_unspecified() || first.port == addr.port());
}
