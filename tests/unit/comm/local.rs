use super::*;

#[test]
fn receives_on_same_pair_match_in_posting_order() {
    let out = LocalCluster::run(2, |comm| {
        if comm.rank() == 1 {
            for v in [1, 2, 3] {
                comm.send(0, 5, Payload::I64(vec![v])).unwrap();
            }
            return Vec::new();
        }
        let first = comm.irecv(1, 5).unwrap();
        let second = comm.irecv(1, 5).unwrap();
        let third = comm.irecv(1, 5).unwrap();
        // wait out of order; matching still follows posting order
        let c = third.wait().unwrap().into_i64().unwrap()[0];
        let a = first.wait().unwrap().into_i64().unwrap()[0];
        let b = second.wait().unwrap().into_i64().unwrap()[0];
        vec![a, b, c]
    });
    assert_eq!(out[0], vec![1, 2, 3]);
}

#[test]
fn tags_isolate_traffic() {
    let out = LocalCluster::run(2, |comm| {
        if comm.rank() == 0 {
            comm.send(1, 1, Payload::F32(vec![1.0])).unwrap();
            comm.send(1, 2, Payload::F32(vec![2.0])).unwrap();
            return 0.0;
        }
        let two = comm.recv(0, 2).unwrap().into_f32().unwrap()[0];
        let one = comm.recv(0, 1).unwrap().into_f32().unwrap()[0];
        two * 10.0 + one
    });
    assert_eq!(out[1], 21.0);
}

#[test]
fn self_messages_are_delivered() {
    let out = LocalCluster::run(1, |comm| {
        let req = comm.isend(0, 3, Payload::F64(vec![0.5])).unwrap();
        req.wait().unwrap();
        comm.recv(0, 3).unwrap()
    });
    assert_eq!(out[0], Payload::F64(vec![0.5]));
}

#[test]
fn out_of_range_peer_is_an_error() {
    let comms = LocalCluster::communicators(2);
    assert!(comms[0].isend(2, 0, Payload::I64(Vec::new())).is_err());
    assert!(comms[1].irecv(9, 0).is_err());
    assert_eq!(comms[1].size(), 2);
}

#[test]
fn receive_from_exited_rank_is_a_communication_error() {
    let out = LocalCluster::run(2, |comm| {
        if comm.rank() == 1 {
            comm.send(0, 7, Payload::I64(vec![42])).unwrap();
            drop(comm);
            return None;
        }
        let first = comm.recv(1, 7).unwrap().into_i64().unwrap();
        let second = comm.recv(1, 7);
        Some((first, second))
    });

    let (first, second) = out[0].as_ref().unwrap();
    // data sent before the exit is still delivered
    assert_eq!(first, &vec![42]);
    let err = second.as_ref().unwrap_err();
    assert!(matches!(err, CompositorError::Communication(_)));
    assert!(err.to_string().contains("rank 1 exited"));
}

#[test]
fn panicking_rank_unblocks_its_peers_and_re_panics() {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        LocalCluster::run(3, |comm| {
            if comm.rank() == 2 {
                panic!("rank 2 failed mid-frame");
            }
            comm.gather_i64(0, 1).map(|_| ())
        })
    }));
    assert!(outcome.is_err());
}

#[test]
fn exit_notice_does_not_disturb_completed_exchanges() {
    let out = LocalCluster::run(3, |comm| {
        let me = comm.rank() as i64;
        let summary = comm.all_to_all_i64(&[me, me, me], 1).unwrap();
        comm.barrier().unwrap();
        summary
    });
    for row in out {
        assert_eq!(row, vec![0, 1, 2]);
    }
}
