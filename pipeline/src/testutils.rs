use shared::events::{LiveContext, Moment, MomentDetected, MomentType, Rivalry, SeasonContext, Stage};

pub fn moment(moment_type: MomentType) -> MomentDetected {
    MomentDetected {
        match_id: "match_1".into(),
        sport: "football".into(),
        league: "premier".into(),
        season_context: SeasonContext {
            tournament: "cup".into(),
            stage: Stage::League,
            must_win: false,
            points_pressure: 0.4,
            rivalry: Rivalry::Med,
        },
        live_context: LiveContext {
            clock: "55:00".into(),
            win_probability: 0.5,
            swing: 0.1,
        },
        moment: Moment {
            moment_type,
            entity_id: "team_home".into(),
            intensity: 0.7,
            window_sec: 90,
        },
    }
}
